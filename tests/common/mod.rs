//! Shared wiremock fixtures for the control-plane tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use aura_lifecycle::auth::{Credentials, TokenManager};
use aura_lifecycle::client::AuraClient;
use aura_lifecycle::clock::Clock;
use aura_lifecycle::retry::RetryConfig;
use aura_lifecycle::transport::Transport;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/oauth/token";
pub const INSTANCES_PATH: &str = "/v1/instances";
pub const TENANT: &str = "tenant-1";

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        base_backoff_ms: 10,
        max_backoff_ms: 50,
        jitter_ms: 0,
        status_codes: vec![500, 502, 503],
        connect_errors_only: false,
    }
}

pub fn client_for(server: &MockServer, clock: Option<Arc<dyn Clock>>) -> AuraClient {
    let transport = Transport::new(Duration::from_secs(5), fast_retry()).unwrap();
    let mut tokens = TokenManager::new(
        Credentials::new(format!("{}{}", server.uri(), TOKEN_PATH), "id", "secret"),
        transport.clone(),
    );
    if let Some(clock) = clock {
        tokens = tokens.with_clock(clock);
    }
    AuraClient::new(
        format!("{}{}", server.uri(), INSTANCES_PATH),
        TENANT,
        transport,
        tokens,
    )
}

/// Token endpoint that must be hit exactly `calls` times.
pub async fn mount_token(server: &MockServer, calls: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .expect(calls)
        .mount(server)
        .await;
}

pub fn instance_path(id: &str) -> String {
    format!("{}/{}", INSTANCES_PATH, id)
}

pub fn status_body(status: &str) -> serde_json::Value {
    json!({"data": {"id": "db-1", "name": "gh-action-genai-workshop", "status": status}})
}
