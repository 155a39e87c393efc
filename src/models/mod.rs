pub mod instance;

pub use instance::{
    CreateParams, InstanceCredentials, InstanceDescriptor, InstanceStatus, InstanceTemplate,
};
