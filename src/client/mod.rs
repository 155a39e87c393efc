pub mod aura;

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{CreateParams, InstanceCredentials, InstanceDescriptor, InstanceStatus};

pub use aura::AuraClient;

/// Control-plane operations on a single managed instance.
/// Implementations: AuraClient (REST). Tests substitute scripted fakes.
#[async_trait]
pub trait InstanceApi: Send + Sync {
    /// Request a new instance. Creation is asynchronous on the remote side,
    /// so a returned instance is usually still `creating`.
    async fn create(&self, params: &CreateParams) -> Result<InstanceCredentials>;

    /// Current status, or `InstanceStatus::Unknown` if the instance cannot be found.
    async fn status(&self, instance_id: &str) -> Result<InstanceStatus>;

    /// Delete an instance. `None` means it was already gone.
    async fn delete(&self, instance_id: &str) -> Result<Option<InstanceDescriptor>>;
}
