//! contentswap Core - domain kernel of the blue-green content deployment engine
//!
//! This crate holds everything that does not touch the database:
//! - The canonical error facility (`ExError`) and typed `SwapError` taxonomy
//! - The structured logging facility shared by every crate
//! - Identifier validation and quoting for SQL text
//! - The deterministic identity generator used by content loaders
//! - The static swap group registry
//! - The `ContentDeployment` audit model

pub mod errors;
pub mod ident;
pub mod identity;
pub mod logging_facility;
pub mod model;
pub mod registry;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, Result, SwapError};
pub use ident::{quote_ident, quote_literal, Ident, PhysicalTable, TableRole};
pub use identity::{identity, IdentityScope};
pub use model::{ContentDeployment, DeploymentStatus};
pub use registry::{CrossForeignKey, GroupSelection, SwapGroup, SwapTable};
