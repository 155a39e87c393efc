use anyhow::Context;
use std::time::Duration;

use crate::lifecycle::{DEFAULT_POLL_INTERVAL, DEFAULT_READY_TIMEOUT};
use crate::retry::RetryConfig;

pub const DEFAULT_API_URL: &str = "https://api.neo4j.io/v1/instances";
pub const DEFAULT_AUTH_URL: &str = "https://api.neo4j.io/oauth/token";

#[derive(Debug, Clone)]
pub struct Config {
    /// Instances collection endpoint. Set via AURA_API_URL.
    pub api_url: String,
    /// OAuth token endpoint. Set via AURA_AUTH_URL.
    pub auth_url: String,
    pub poll_interval: Duration,
    pub ready_timeout: Duration,
    /// Per-request timeout, including body download.
    pub http_timeout: Duration,
    pub retry: RetryConfig,
    /// Emit JSON log lines instead of human-readable ones (AURA_LOG_FORMAT=json).
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            http_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            json_logs: false,
        }
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build a config from an arbitrary variable source.
pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();
    let retry_defaults = RetryConfig::default();

    let api_url = validated_url(lookup("AURA_API_URL"), DEFAULT_API_URL, "AURA_API_URL")?;
    let auth_url = validated_url(lookup("AURA_AUTH_URL"), DEFAULT_AUTH_URL, "AURA_AUTH_URL")?;

    let retry = RetryConfig {
        max_retries: parsed(&lookup, "AURA_MAX_RETRIES")?.unwrap_or(retry_defaults.max_retries),
        base_backoff_ms: parsed(&lookup, "AURA_RETRY_BASE_MS")?
            .unwrap_or(retry_defaults.base_backoff_ms),
        max_backoff_ms: parsed(&lookup, "AURA_RETRY_MAX_MS")?
            .unwrap_or(retry_defaults.max_backoff_ms),
        jitter_ms: parsed(&lookup, "AURA_RETRY_JITTER_MS")?.unwrap_or(retry_defaults.jitter_ms),
        ..retry_defaults
    };
    if retry.base_backoff_ms > retry.max_backoff_ms {
        anyhow::bail!(
            "AURA_RETRY_BASE_MS ({}) must not exceed AURA_RETRY_MAX_MS ({})",
            retry.base_backoff_ms,
            retry.max_backoff_ms
        );
    }

    let poll_interval = parsed(&lookup, "AURA_POLL_INTERVAL_SECS")?
        .map(Duration::from_secs)
        .unwrap_or(defaults.poll_interval);
    if poll_interval.is_zero() {
        anyhow::bail!("AURA_POLL_INTERVAL_SECS must be at least 1");
    }

    Ok(Config {
        api_url,
        auth_url,
        poll_interval,
        ready_timeout: parsed(&lookup, "AURA_READY_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.ready_timeout),
        http_timeout: parsed(&lookup, "AURA_HTTP_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.http_timeout),
        retry,
        json_logs: lookup("AURA_LOG_FORMAT")
            .map(|v| v.trim().eq_ignore_ascii_case("json"))
            .unwrap_or(false),
    })
}

fn parsed<F, T>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        _ => Ok(None),
    }
}

fn validated_url(raw: Option<String>, default: &str, key: &str) -> anyhow::Result<String> {
    let value = raw
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string());
    let parsed = url::Url::parse(&value).with_context(|| format!("{} is not a valid URL", key))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("{} must be an http(s) URL, got {}", key, value);
    }
    Ok(value.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.ready_timeout, Duration::from_secs(300));
        assert_eq!(cfg.retry, RetryConfig::default());
        assert!(!cfg.json_logs);
    }

    #[test]
    fn test_overrides() {
        let cfg = from_lookup(lookup(&[
            ("AURA_API_URL", "http://localhost:8080/v1/instances/"),
            ("AURA_POLL_INTERVAL_SECS", "2"),
            ("AURA_READY_TIMEOUT_SECS", "600"),
            ("AURA_MAX_RETRIES", "0"),
            ("AURA_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_url, "http://localhost:8080/v1/instances");
        assert_eq!(cfg.poll_interval, Duration::from_secs(2));
        assert_eq!(cfg.ready_timeout, Duration::from_secs(600));
        assert_eq!(cfg.retry.max_retries, 0);
        assert!(cfg.json_logs);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(from_lookup(lookup(&[("AURA_MAX_RETRIES", "lots")])).is_err());
        assert!(from_lookup(lookup(&[("AURA_API_URL", "ftp://example.com")])).is_err());
        assert!(from_lookup(lookup(&[("AURA_AUTH_URL", "not a url")])).is_err());
        assert!(from_lookup(lookup(&[("AURA_POLL_INTERVAL_SECS", "0")])).is_err());
        assert!(from_lookup(lookup(&[
            ("AURA_RETRY_BASE_MS", "5000"),
            ("AURA_RETRY_MAX_MS", "100"),
        ]))
        .is_err());
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let cfg = from_lookup(lookup(&[("AURA_MAX_RETRIES", " "), ("AURA_API_URL", "")])).unwrap();
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
    }
}
