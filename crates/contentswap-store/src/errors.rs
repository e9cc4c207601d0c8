//! Error handling for contentswap-store
//!
//! Wraps the core ExError with store-specific constructors

use contentswap_core::errors::{ExError, ExErrorKind};
use contentswap_core::registry::SwapGroup;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: recorded {}, embedded {}",
            migration_id, expected, actual
        ))
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// A statement inside a swap transaction failed
///
/// The caller returns this error without committing, so the transaction
/// rolls back. The message names the group and step, the source carries the
/// SQLite error text.
pub fn step_failed(group: SwapGroup, step: &str, err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Transaction)
        .with_op(step.to_string())
        .with_group(group.name())
        .with_message(format!(
            "Promotion of group {} failed at step {}; transaction rolled back",
            group, step
        ))
        .with_source(from_rusqlite(err))
}

/// Wrap an error raised while a swap transaction was open
///
/// Transaction-class errors pass through; anything else is reclassified so
/// callers can rely on `is_transaction()` for every in-transaction failure.
pub fn in_transaction(group: SwapGroup, err: ExError) -> ExError {
    if err.kind().is_transaction() {
        return err;
    }
    ExError::new(ExErrorKind::Transaction)
        .with_op(err.op().unwrap_or("swap").to_string())
        .with_group(group.name())
        .with_message(format!(
            "Promotion of group {} failed; transaction rolled back",
            group
        ))
        .with_source(err)
}

/// Create an internal invariant error
pub fn internal(op: &str, message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op(op.to_string())
        .with_message(message)
}
