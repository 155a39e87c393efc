//! Client-credentials token management.
//!
//! A token is minted by `POST {endpoint}` with HTTP Basic auth and the form
//! body `grant_type=client_credentials`. It is kept in memory with its issue
//! time and re-minted once it is [`TOKEN_REFRESH_AFTER_SECS`] old.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::clock::{Clock, SystemClock};
use crate::errors::{snippet, LifecycleError, Result};
use crate::transport::Transport;

/// Tokens are valid for an hour; refresh one second early.
pub const TOKEN_REFRESH_AFTER_SECS: i64 = 3599;

// ── Types ────────────────────────────────────────────────────

/// API client credentials. Used only to mint tokens.
#[derive(Clone)]
pub struct Credentials {
    pub endpoint: String,
    pub client_id: String,
    client_secret: Zeroizing<String>,
}

impl Credentials {
    pub fn new(
        endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            client_id: client_id.into(),
            client_secret: Zeroizing::new(client_secret.into()),
        }
    }

    fn basic_auth(&self) -> Result<HeaderValue> {
        let raw = Zeroizing::new(format!("{}:{}", self.client_id, self.client_secret.as_str()));
        let mut value = HeaderValue::from_str(&format!("Basic {}", STANDARD.encode(raw.as_bytes())))
            .map_err(|_| LifecycleError::Config("client credentials are not header-safe".into()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// The last token issued and when.
pub struct TokenState {
    access_token: Zeroizing<String>,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

// ── Manager ──────────────────────────────────────────────────

pub struct TokenManager {
    credentials: Credentials,
    transport: Transport,
    clock: Arc<dyn Clock>,
    state: Option<TokenState>,
}

impl TokenManager {
    pub fn new(credentials: Credentials, transport: Transport) -> Self {
        Self {
            credentials,
            transport,
            clock: Arc::new(SystemClock),
            state: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.state.as_ref().map(|s| s.issued_at)
    }

    /// True when no token was ever issued or the current one is too old.
    pub fn needs_refresh(&self) -> bool {
        match &self.state {
            None => true,
            Some(state) => {
                self.clock.now() - state.issued_at >= Duration::seconds(TOKEN_REFRESH_AFTER_SECS)
            }
        }
    }

    /// Mint a new token if the current one is missing or expired.
    /// Returns whether a refresh happened.
    pub async fn ensure_valid_token(&mut self) -> Result<bool> {
        if !self.needs_refresh() {
            tracing::debug!("Token is valid");
            return Ok(false);
        }

        let token = self.exchange().await?;
        let issued_at = self.clock.now();
        self.state = Some(TokenState {
            access_token: token,
            issued_at,
        });
        tracing::info!(issued_at = %issued_at.to_rfc3339(), "Token generation successful");
        Ok(true)
    }

    /// A valid bearer token, refreshing first if needed.
    pub async fn bearer(&mut self) -> Result<Zeroizing<String>> {
        self.ensure_valid_token().await?;
        self.state
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or_else(|| LifecycleError::Authentication("no token available".into()))
    }

    async fn exchange(&self) -> Result<Zeroizing<String>> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers.insert(AUTHORIZATION, self.credentials.basic_auth()?);

        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "client_credentials")
            .finish();

        tracing::debug!(endpoint = %self.credentials.endpoint, "Requesting access token");
        let resp = self
            .transport
            .send(Method::POST, &self.credentials.endpoint, headers, Bytes::from(form))
            .await?;

        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(LifecycleError::Authentication(format!(
                "token endpoint returned {}: {}",
                status,
                snippet(&body)
            )));
        }

        let parsed: TokenResponse = serde_json::from_slice(&body).map_err(|e| {
            LifecycleError::Authentication(format!("invalid token response: {}", e))
        })?;

        match parsed.access_token {
            Some(token) if !token.trim().is_empty() => Ok(Zeroizing::new(token)),
            _ => Err(LifecycleError::Authentication(
                "token response has no access_token".into(),
            )),
        }
    }
}
