//! Domain models

pub mod deployment;

pub use deployment::{ContentDeployment, DeploymentStatus};
