use bytes::Bytes;
use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

// ── Retry Configuration ──────────────────────────────────────

/// Bounded retry policy for control-plane calls.
///
/// Network errors are retried (only connect failures when
/// `connect_errors_only` is set); HTTP responses only when their status is
/// listed in `status_codes`. Once `max_retries` is exhausted the last
/// response (or error) is handed back to the caller untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_backoff")]
    pub base_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_jitter")]
    pub jitter_ms: u64,
    #[serde(default = "default_retry_status_codes")]
    pub status_codes: Vec<u16>,
    #[serde(default)]
    pub connect_errors_only: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff(),
            max_backoff_ms: default_max_backoff(),
            jitter_ms: default_jitter(),
            status_codes: default_retry_status_codes(),
            connect_errors_only: false,
        }
    }
}

impl RetryConfig {
    /// A policy that sends each request exactly once.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Variant for requests that must not be replayed once the server may
    /// have seen them: only 429 and failed connects are retried.
    pub fn non_idempotent(&self) -> Self {
        Self {
            status_codes: self.status_codes.iter().copied().filter(|c| *c == 429).collect(),
            connect_errors_only: true,
            ..self.clone()
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    10_000
}
fn default_jitter() -> u64 {
    100
}
fn default_retry_status_codes() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

// ── Execution ────────────────────────────────────────────────

/// Send a request, retrying transient failures according to `config`.
///
/// Headers and body are cloned per attempt, so `body` should be cheap to clone.
pub async fn send_with_retry(
    client: &Client,
    method: Method,
    url: &str,
    headers: HeaderMap,
    body: Bytes,
    config: &RetryConfig,
) -> Result<Response, reqwest::Error> {
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = client
            .request(method.clone(), url)
            .headers(headers.clone())
            .body(body.clone())
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                if !config.status_codes.contains(&status.as_u16()) {
                    return Ok(response);
                }

                if attempt > config.max_retries {
                    debug!(
                        "Exhausted {} retries for {} {}; last status: {}",
                        config.max_retries, method, url, status
                    );
                    return Ok(response);
                }

                let wait = wait_time(&response, config, attempt);
                warn!(
                    "{} {} attempt {}/{} returned {}. Retrying in {:?}",
                    method,
                    url,
                    attempt,
                    config.max_retries + 1,
                    status,
                    wait
                );
                sleep(wait).await;
            }
            Err(e) => {
                if attempt > config.max_retries || (config.connect_errors_only && !e.is_connect()) {
                    warn!("{} {} failed after {} attempts: {}", method, url, attempt, e);
                    return Err(e);
                }

                let wait = backoff(config, attempt);
                warn!(
                    "{} {} attempt {}/{} failed: {}. Retrying in {:?}",
                    method,
                    url,
                    attempt,
                    config.max_retries + 1,
                    e,
                    wait
                );
                sleep(wait).await;
            }
        }
    }
}

/// Honour a numeric `Retry-After` header, capped at `max_backoff_ms`.
fn wait_time(response: &Response, config: &RetryConfig, attempt: u32) -> Duration {
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    match retry_after {
        Some(secs) => Duration::from_secs(secs).min(Duration::from_millis(config.max_backoff_ms)),
        None => backoff(config, attempt),
    }
}

/// Exponential backoff: `base * 2^(attempt - 1)`, capped, plus jitter.
fn backoff(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(32);
    let raw = config.base_backoff_ms.saturating_mul(1u64 << exp);
    let capped = raw.min(config.max_backoff_ms);

    let jitter = if config.jitter_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=config.jitter_ms)
    };

    Duration::from_millis(capped + jitter)
}
