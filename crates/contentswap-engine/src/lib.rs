//! contentswap Engine - Orchestration layer
//!
//! Coordinates validation, the swap transaction, the audit record and
//! staging recreation into one promotion command.

pub mod commands;
