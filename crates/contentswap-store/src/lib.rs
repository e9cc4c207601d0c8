//! contentswap Store - SQLite side of the blue-green content deployment engine
//!
//! Provides:
//! - Connection management and the embedded migration runner
//! - Catalog introspection over `sqlite_master` and the pragma functions
//! - The staging validator, swap executor, deployment recorder and staging
//!   recreator

pub mod catalog;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod recorder;
pub mod recreate;
pub mod swap;
pub mod validator;

// Re-export key types
pub use errors::Result;
pub use recreate::recreate_staging;
pub use swap::{swap, SwapOptions, SwapOutcome};
pub use validator::{validate, StagingReport};
