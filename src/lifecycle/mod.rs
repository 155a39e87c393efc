//! Lifecycle orchestration: create → wait until running → emit credentials,
//! and teardown.
//!
//! Status transitions are driven entirely by the control plane
//! (`unknown → creating → running → deleting`); this module only observes.

pub mod locks;

use std::fmt::Write as _;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::client::InstanceApi;
use crate::errors::Result;
use crate::models::{InstanceCredentials, InstanceDescriptor, InstanceStatus, InstanceTemplate};

pub use locks::InstanceLocks;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub poll_interval: Duration,
    pub ready_timeout: Duration,
    pub template: InstanceTemplate,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            template: InstanceTemplate::default(),
        }
    }
}

/// Result of waiting for a target status. A timeout is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready { status: InstanceStatus, polls: u32 },
    TimedOut { last: InstanceStatus, polls: u32 },
}

impl WaitOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitOutcome::Ready { .. })
    }

    /// The last status observed.
    pub fn status(&self) -> &InstanceStatus {
        match self {
            WaitOutcome::Ready { status, .. } => status,
            WaitOutcome::TimedOut { last, .. } => last,
        }
    }

    pub fn polls(&self) -> u32 {
        match self {
            WaitOutcome::Ready { polls, .. } | WaitOutcome::TimedOut { polls, .. } => *polls,
        }
    }
}

/// A created instance and how the wait for it ended.
#[derive(Debug, Clone)]
pub struct ConfiguredInstance {
    pub credentials: InstanceCredentials,
    pub outcome: WaitOutcome,
}

impl ConfiguredInstance {
    pub fn env_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("AURA_INSTANCEID", self.credentials.id.clone()),
            ("NEO4J_URI", self.credentials.connection_url.clone()),
            ("NEO4J_USERNAME", self.credentials.username.clone()),
            ("NEO4J_PASSWORD", self.credentials.password.clone()),
            ("AURA_DS", "true".to_string()),
        ]
    }

    /// `KEY=value` lines suitable for `$GITHUB_ENV` or `source`.
    pub fn env_lines(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.env_pairs() {
            let _ = writeln!(out, "{}={}", key, value);
        }
        out
    }
}

pub struct Lifecycle<A> {
    api: A,
    settings: LifecycleSettings,
    locks: InstanceLocks,
}

impl<A: InstanceApi> Lifecycle<A> {
    pub fn new(api: A, settings: LifecycleSettings) -> Self {
        Self {
            api,
            settings,
            locks: InstanceLocks::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    pub async fn status(&self, instance_id: &str) -> Result<InstanceStatus> {
        self.api.status(instance_id).await
    }

    /// Poll until `instance_id` reports `target` or `timeout` elapses.
    ///
    /// The first poll is immediate. `Unknown` does not end the wait: a new
    /// instance may not be visible yet. Returns within `timeout` plus one
    /// poll interval, even when status requests hang or keep retrying.
    pub async fn wait_for_status(
        &self,
        instance_id: &str,
        target: &InstanceStatus,
        timeout: Duration,
    ) -> Result<WaitOutcome> {
        let guard = self.locks.acquire(instance_id).await;
        let outcome = self.poll_until(instance_id, target, timeout).await;
        drop(guard);
        self.locks.prune();
        outcome
    }

    async fn poll_until(
        &self,
        instance_id: &str,
        target: &InstanceStatus,
        timeout: Duration,
    ) -> Result<WaitOutcome> {
        let deadline = Instant::now() + timeout;
        let hard_stop = deadline + self.settings.poll_interval;

        let mut current = InstanceStatus::Unknown;
        let mut polls = 0;

        loop {
            let remaining = hard_stop.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, self.api.status(instance_id)).await {
                Ok(status) => {
                    current = status?;
                    polls += 1;
                }
                Err(_) => {
                    tracing::warn!(
                        instance_id = %instance_id,
                        target = %target,
                        last = %current,
                        polls,
                        "Status request outlived the wait deadline"
                    );
                    return Ok(WaitOutcome::TimedOut {
                        last: current,
                        polls,
                    });
                }
            }
            if polls > 1 {
                tracing::info!(instance_id = %instance_id, status = %current, "Waiting");
            }

            if current == *target {
                tracing::info!(instance_id = %instance_id, status = %current, polls, "Instance reached target status");
                return Ok(WaitOutcome::Ready {
                    status: current,
                    polls,
                });
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    instance_id = %instance_id,
                    target = %target,
                    last = %current,
                    polls,
                    "Timed out waiting for instance status"
                );
                return Ok(WaitOutcome::TimedOut {
                    last: current,
                    polls,
                });
            }

            sleep(self.settings.poll_interval.min(deadline - now)).await;
        }
    }

    /// Create an instance from the template and wait for it to be running.
    pub async fn configure(&self, region: &str, cloud_provider: &str) -> Result<ConfiguredInstance> {
        tracing::info!(region = %region, cloud_provider = %cloud_provider, "Creating instance");
        let params = self.settings.template.params(region, cloud_provider);
        let credentials = self.api.create(&params).await?;

        tracing::info!(instance_id = %credentials.id, "Waiting for instance to come online");
        let outcome = self
            .wait_for_status(&credentials.id, &InstanceStatus::Running, self.settings.ready_timeout)
            .await?;

        Ok(ConfiguredInstance {
            credentials,
            outcome,
        })
    }

    /// Delete an instance. Deleting one that is already gone is not an error.
    pub async fn teardown(&self, instance_id: &str) -> Result<Option<InstanceDescriptor>> {
        let guard = self.locks.acquire(instance_id).await;
        tracing::info!(instance_id = %instance_id, "Deleting instance");
        let deleted = self.api.delete(instance_id).await;
        drop(guard);
        self.locks.prune();

        let deleted = deleted?;
        if deleted.is_none() {
            tracing::info!(instance_id = %instance_id, "Instance already absent");
        }
        Ok(deleted)
    }
}
