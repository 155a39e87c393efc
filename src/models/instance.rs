use serde::{Deserialize, Serialize};
use std::fmt;

// ── Status ───────────────────────────────────────────────────

/// Lifecycle status as reported by the control plane.
///
/// `Unknown` is the sentinel for "no authoritative data": the instance does
/// not exist yet, was deleted, or the lookup returned nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstanceStatus {
    Creating,
    Running,
    Updating,
    Pausing,
    Paused,
    Resuming,
    Deleting,
    Destroying,
    Other(String),
    Unknown,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InstanceStatus::Creating => "creating",
            InstanceStatus::Running => "running",
            InstanceStatus::Updating => "updating",
            InstanceStatus::Pausing => "pausing",
            InstanceStatus::Paused => "paused",
            InstanceStatus::Resuming => "resuming",
            InstanceStatus::Deleting => "deleting",
            InstanceStatus::Destroying => "destroying",
            InstanceStatus::Other(raw) => raw,
            InstanceStatus::Unknown => "Unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, InstanceStatus::Unknown)
    }
}

impl From<&str> for InstanceStatus {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "creating" => InstanceStatus::Creating,
            "running" => InstanceStatus::Running,
            "updating" => InstanceStatus::Updating,
            "pausing" => InstanceStatus::Pausing,
            "paused" => InstanceStatus::Paused,
            "resuming" => InstanceStatus::Resuming,
            "deleting" => InstanceStatus::Deleting,
            "destroying" => InstanceStatus::Destroying,
            "" | "unknown" => InstanceStatus::Unknown,
            _ => InstanceStatus::Other(raw.trim().to_string()),
        }
    }
}

impl From<String> for InstanceStatus {
    fn from(raw: String) -> Self {
        InstanceStatus::from(raw.as_str())
    }
}

impl From<InstanceStatus> for String {
    fn from(status: InstanceStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Payloads ─────────────────────────────────────────────────

/// Connection details returned by a successful create.
/// Exactly the fields downstream consumers need and nothing else.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceCredentials {
    pub id: String,
    pub connection_url: String,
    pub name: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for InstanceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCredentials")
            .field("id", &self.id)
            .field("connection_url", &self.connection_url)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Instance metadata from a lookup or delete. Only `id` is guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "unknown_status", deserialize_with = "nullable_status")]
    pub status: InstanceStatus,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub cloud_provider: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default, rename = "type")]
    pub instance_type: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub connection_url: Option<String>,
}

fn unknown_status() -> InstanceStatus {
    InstanceStatus::Unknown
}

fn nullable_status<'de, D>(deserializer: D) -> Result<InstanceStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(InstanceStatus::from).unwrap_or(InstanceStatus::Unknown))
}

// ── Requests ─────────────────────────────────────────────────

/// Fixed shape of a new instance. Region and provider come from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceTemplate {
    pub name: String,
    pub version: String,
    pub memory: String,
    #[serde(rename = "type")]
    pub instance_type: String,
}

impl Default for InstanceTemplate {
    fn default() -> Self {
        Self {
            name: "gh-action-genai-workshop".to_string(),
            version: "5".to_string(),
            memory: "8GB".to_string(),
            instance_type: "enterprise-ds".to_string(),
        }
    }
}

impl InstanceTemplate {
    pub fn params(&self, region: &str, cloud_provider: &str) -> CreateParams {
        CreateParams {
            name: self.name.clone(),
            version: self.version.clone(),
            region: region.to_string(),
            memory: self.memory.clone(),
            instance_type: self.instance_type.clone(),
            cloud_provider: cloud_provider.to_string(),
        }
    }
}

/// Parameters for a create call. The client adds `tenant_id` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateParams {
    pub name: String,
    pub version: String,
    pub region: String,
    pub memory: String,
    #[serde(rename = "type")]
    pub instance_type: String,
    pub cloud_provider: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRequest<'a> {
    #[serde(flatten)]
    pub params: &'a CreateParams,
    pub tenant_id: &'a str,
}

/// Control-plane response wrapper: `{data: ...}` or `{errors: [...]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

impl Envelope {
    /// `data` if present and non-empty.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match &self.data {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Object(map)) if map.is_empty() => None,
            Some(serde_json::Value::Array(items)) if items.is_empty() => None,
            Some(value) => Some(value),
        }
    }

    pub fn errors(&self) -> serde_json::Value {
        self.errors.clone().unwrap_or_else(|| serde_json::json!([]))
    }
}
