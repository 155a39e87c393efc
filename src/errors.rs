use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by the lifecycle client.
///
/// "Not found" is deliberately absent: an instance the control plane cannot
/// find is reported as `InstanceStatus::Unknown` by `status()` and as `None`
/// by `delete()`.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("instance creation failed: {errors}")]
    Creation { errors: serde_json::Value },

    #[error("control plane returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("malformed control plane response: {0}")]
    MalformedResponse(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl LifecycleError {
    /// Hard errors abort the run; soft errors leave the caller a choice.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, LifecycleError::Creation { .. })
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;

/// Truncate a response body for inclusion in an error message.
pub(crate) fn snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(200) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_creation_error_is_not_fatal() {
        let err = LifecycleError::Creation {
            errors: json!([{"message": "quota exceeded"}]),
        };
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_auth_and_api_errors_are_fatal() {
        assert!(LifecycleError::Authentication("no token".into()).is_fatal());
        let api = LifecycleError::Api {
            status: StatusCode::FORBIDDEN,
            body: "denied".into(),
        };
        assert!(api.is_fatal());
        assert_eq!(api.to_string(), "control plane returned 403 Forbidden: denied");
    }

    #[test]
    fn test_snippet_truncates_long_bodies() {
        let long = "x".repeat(500);
        let s = snippet(long.as_bytes());
        assert_eq!(s.chars().count(), 201);
        assert!(s.ends_with('…'));
        assert_eq!(snippet(b"short"), "short");
    }
}
