/// HTTP transport shared by the token manager and the instance client.
/// Wraps a single reqwest client with the caller's retry policy.
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use std::time::Duration;

use crate::errors::{LifecycleError, Result};
use crate::retry::{send_with_retry, RetryConfig};

#[derive(Clone)]
pub struct Transport {
    client: Client,
    retry: RetryConfig,
}

impl Transport {
    pub fn new(request_timeout: Duration, retry: RetryConfig) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("aura-lifecycle/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LifecycleError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, retry })
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    pub async fn send(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Response> {
        let resp = send_with_retry(&self.client, method, url, headers, body, &self.retry).await?;
        Ok(resp)
    }

    /// Like [`send`](Self::send), for requests with side effects: a request
    /// the server may have received is never sent twice.
    pub async fn send_non_idempotent(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Response> {
        let retry = self.retry.non_idempotent();
        let resp = send_with_retry(&self.client, method, url, headers, body, &retry).await?;
        Ok(resp)
    }
}

/// JSON content type plus a bearer credential.
pub fn bearer_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| LifecycleError::Authentication("token contains invalid header characters".into()))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    Ok(headers)
}
