//! Lifecycle client for managed graph database instances.
//!
//! Authenticate → create → poll until running → delete, against a REST
//! control plane. The `aura` binary wraps this for CI pipelines.

pub mod auth;
pub mod cli;
pub mod client;
pub mod clock;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod models;
pub mod retry;
pub mod transport;

pub use errors::{LifecycleError, Result};
