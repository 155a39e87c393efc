//! Token manager behaviour against a mocked OAuth endpoint.

mod common;

use std::sync::Arc;

use aura_lifecycle::client::InstanceApi;
use aura_lifecycle::clock::ManualClock;
use aura_lifecycle::LifecycleError;
use chrono::{Duration, TimeZone, Utc};
use common::*;
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_second_check_within_a_second_reuses_token() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    let client = client_for(&server, None);
    assert!(client.ensure_valid_token().await.unwrap());
    assert!(!client.ensure_valid_token().await.unwrap());
}

#[tokio::test]
async fn test_refresh_happens_at_3599_seconds_not_before() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;

    let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(t0));
    let client = client_for(&server, Some(clock.clone()));

    assert!(client.ensure_valid_token().await.unwrap());

    clock.set(t0 + Duration::seconds(3598));
    assert!(!client.ensure_valid_token().await.unwrap());

    clock.set(t0 + Duration::seconds(3599));
    assert!(client.ensure_valid_token().await.unwrap());

    clock.advance(Duration::seconds(10));
    assert!(!client.ensure_valid_token().await.unwrap());
}

#[tokio::test]
async fn test_exchange_uses_basic_auth_and_client_credentials_grant() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("authorization", "Basic aWQ6c2VjcmV0"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    assert!(client.ensure_valid_token().await.unwrap());
}

#[tokio::test]
async fn test_instance_calls_carry_bearer_token() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(instance_path("db-1")))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("running")))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    client.status("db-1").await.unwrap();
    client.status("db-1").await.unwrap();
}

#[tokio::test]
async fn test_rejected_exchange_is_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_client"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("running")))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let err = client.ensure_valid_token().await.unwrap_err();
    assert!(matches!(err, LifecycleError::Authentication(ref m) if m.contains("401")));

    // No stale or empty token is ever sent.
    let err = client.status("db-1").await.unwrap_err();
    assert!(matches!(err, LifecycleError::Authentication(_)));
}

#[tokio::test]
async fn test_missing_access_token_is_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "bearer"})))
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let err = client.ensure_valid_token().await.unwrap_err();
    assert!(matches!(err, LifecycleError::Authentication(_)));
}

#[tokio::test]
async fn test_non_json_token_response_is_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let err = client.ensure_valid_token().await.unwrap_err();
    assert!(matches!(err, LifecycleError::Authentication(_)));
}
