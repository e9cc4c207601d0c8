//! Migration framework for the engine's own bookkeeping tables
//!
//! Provides:
//! - Migration runner with checksums and idempotent application
//! - Embedded SQL migrations

mod checksums;
mod embedded;
mod runner;

pub use runner::{applied_migrations, apply_migrations};
