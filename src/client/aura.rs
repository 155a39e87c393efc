//! REST client for the Aura instances API.
//!
//! - `POST   {base_url}`       create
//! - `GET    {base_url}/{id}`  status
//! - `DELETE {base_url}/{id}`  delete
//!
//! Every call obtains a bearer token from the [`TokenManager`] first, which
//! refreshes it when it has expired.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, StatusCode};
use tokio::sync::Mutex;
use url::Url;

use super::InstanceApi;
use crate::auth::TokenManager;
use crate::errors::{snippet, LifecycleError, Result};
use crate::models::instance::{CreateRequest, Envelope};
use crate::models::{CreateParams, InstanceCredentials, InstanceDescriptor, InstanceStatus};
use crate::transport::{bearer_headers, Transport};

pub struct AuraClient {
    base_url: String,
    tenant_id: String,
    transport: Transport,
    tokens: Mutex<TokenManager>,
}

impl AuraClient {
    pub fn new(
        base_url: impl Into<String>,
        tenant_id: impl Into<String>,
        transport: Transport,
        tokens: TokenManager,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tenant_id: tenant_id.into(),
            transport,
            tokens: Mutex::new(tokens),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Refresh the bearer token if it has expired. Returns whether it did.
    pub async fn ensure_valid_token(&self) -> Result<bool> {
        self.tokens.lock().await.ensure_valid_token().await
    }

    /// `{base_url}/{id}` with the id as a single encoded path segment.
    /// `None` for ids that cannot name an instance.
    fn instance_url(&self, instance_id: &str) -> Result<Option<Url>> {
        if matches!(instance_id, "" | "." | "..") {
            return Ok(None);
        }
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| LifecycleError::Config(format!("invalid instances URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| LifecycleError::Config(format!("instances URL {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .push(instance_id);
        Ok(Some(url))
    }

    async fn call(&self, method: Method, url: &str, body: Bytes) -> Result<(StatusCode, Bytes)> {
        let token = self.tokens.lock().await.bearer().await?;
        let headers = bearer_headers(&token)?;
        let resp = if method.is_idempotent() {
            self.transport.send(method, url, headers, body).await?
        } else {
            self.transport.send_non_idempotent(method, url, headers, body).await?
        };
        let status = resp.status();
        let body = resp.bytes().await?;

        // A rejected token is never "not found"; it must abort the run.
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LifecycleError::Api {
                status,
                body: snippet(&body),
            });
        }
        Ok((status, body))
    }
}

fn parse_envelope(status: StatusCode, body: &[u8]) -> Result<Envelope> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Envelope {
            data: None,
            errors: None,
        });
    }
    serde_json::from_slice(body).map_err(|e| {
        if status.is_success() {
            LifecycleError::MalformedResponse(format!("{} (body: {})", e, snippet(body)))
        } else {
            LifecycleError::Api {
                status,
                body: snippet(body),
            }
        }
    })
}

fn is_not_found(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND || status == StatusCode::GONE
}

#[async_trait]
impl InstanceApi for AuraClient {
    async fn create(&self, params: &CreateParams) -> Result<InstanceCredentials> {
        let request = CreateRequest {
            params,
            tenant_id: &self.tenant_id,
        };
        let body = serde_json::to_vec(&request)
            .map_err(|e| LifecycleError::Config(format!("unserializable create params: {}", e)))?;

        let (status, body) = self.call(Method::POST, &self.base_url, Bytes::from(body)).await?;
        let envelope = parse_envelope(status, &body)?;

        match envelope.payload() {
            Some(data) => {
                let creds: InstanceCredentials = serde_json::from_value(data.clone())
                    .map_err(|e| LifecycleError::MalformedResponse(format!("create payload: {}", e)))?;
                tracing::info!(
                    instance_id = %creds.id,
                    name = %creds.name,
                    "Instance creation accepted"
                );
                Ok(creds)
            }
            None if !status.is_success() && envelope.errors.is_none() => {
                tracing::warn!(http_status = %status, "Instance creation rejected without an error list");
                Err(LifecycleError::Api {
                    status,
                    body: snippet(&body),
                })
            }
            None => {
                let errors = envelope.errors();
                tracing::warn!(http_status = %status, errors = %errors, "Instance creation not successful");
                Err(LifecycleError::Creation { errors })
            }
        }
    }

    async fn status(&self, instance_id: &str) -> Result<InstanceStatus> {
        let Some(url) = self.instance_url(instance_id)? else {
            tracing::warn!(instance_id = %instance_id, "Not a valid instance id");
            return Ok(InstanceStatus::Unknown);
        };
        let (status, body) = self.call(Method::GET, url.as_str(), Bytes::new()).await?;

        if is_not_found(status) {
            tracing::info!(instance_id = %instance_id, "Unable to retrieve instance status");
            return Ok(InstanceStatus::Unknown);
        }
        if !status.is_success() {
            return Err(LifecycleError::Api {
                status,
                body: snippet(&body),
            });
        }

        let envelope = parse_envelope(status, &body)?;
        let Some(data) = envelope.payload() else {
            tracing::info!(instance_id = %instance_id, "Unable to retrieve instance status");
            return Ok(InstanceStatus::Unknown);
        };

        let current = data
            .get("status")
            .and_then(|s| s.as_str())
            .map(InstanceStatus::from)
            .unwrap_or(InstanceStatus::Unknown);
        Ok(current)
    }

    async fn delete(&self, instance_id: &str) -> Result<Option<InstanceDescriptor>> {
        let Some(url) = self.instance_url(instance_id)? else {
            tracing::warn!(instance_id = %instance_id, "Not a valid instance id, nothing to delete");
            return Ok(None);
        };
        let (status, body) = self.call(Method::DELETE, url.as_str(), Bytes::new()).await?;

        if is_not_found(status) {
            tracing::info!(instance_id = %instance_id, "Instance not found, nothing to delete");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LifecycleError::Api {
                status,
                body: snippet(&body),
            });
        }

        let envelope = parse_envelope(status, &body)?;
        let Some(data) = envelope.payload() else {
            tracing::info!(
                instance_id = %instance_id,
                errors = %envelope.errors(),
                "Instance not found or unable to delete"
            );
            return Ok(None);
        };

        let descriptor: InstanceDescriptor = serde_json::from_value(data.clone())
            .map_err(|e| LifecycleError::MalformedResponse(format!("delete payload: {}", e)))?;
        tracing::info!(instance_id = %descriptor.id, "Instance deletion accepted");
        Ok(Some(descriptor))
    }
}
