//! Swap executor
//!
//! Promotes the `_staging` tables of one group to live inside a single
//! `IMMEDIATE` transaction. Either every table, trigger and constraint of the
//! group moves to the new content, or the transaction rolls back and nothing
//! changes.
//!
//! SQLite ignores `PRAGMA foreign_keys` inside a transaction, so the pragmas
//! the rename semantics depend on are set on the connection before `BEGIN`
//! and restored after the transaction ends, whatever its outcome.

mod executor;
pub mod foreign_keys;
pub mod guard;

pub use executor::execute_swap;
pub use guard::{GuardEvent, WriteGuard};

use crate::errors::{from_rusqlite, in_transaction, internal, Result};
use contentswap_core::registry::SwapGroup;
use contentswap_core::{log_op_end, log_op_error, log_op_start};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Options for one swap
#[derive(Debug, Clone, Default)]
pub struct SwapOptions {
    /// Keep the previous live tables as `T_retired` after the swap
    pub keep_retired: bool,
}

/// One table moved from staging to live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSwap {
    pub table: &'static str,
    /// Whether a live table existed before (false on first promotion)
    pub had_live: bool,
    /// Rows in the new live table
    pub rows: u64,
    /// Name the previous live table was renamed to
    pub retired: String,
}

/// What a committed swap did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub group: SwapGroup,
    pub tables: Vec<TableSwap>,
    /// Retired tables left behind by an earlier kept-retired promotion
    pub stale_retired_dropped: Vec<String>,
    pub retired_dropped: Vec<String>,
    pub retired_kept: Vec<String>,
    /// Cross-boundary keys added by rebuilding their source table
    pub foreign_keys_rebuilt: Vec<&'static str>,
    /// Cross-boundary keys whose source table does not exist
    pub foreign_keys_skipped: Vec<&'static str>,
}

impl SwapOutcome {
    fn new(group: SwapGroup) -> Self {
        Self {
            group,
            tables: Vec::new(),
            stale_retired_dropped: Vec::new(),
            retired_dropped: Vec::new(),
            retired_kept: Vec::new(),
            foreign_keys_rebuilt: Vec::new(),
            foreign_keys_skipped: Vec::new(),
        }
    }

    /// Total rows now live across the group
    pub fn row_count(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// Swap one group with no further work in the transaction
///
/// ## Errors
///
/// - `ExErrorKind::Transaction`: a statement failed; rolled back
/// - `ExErrorKind::ConstraintViolation`: a cross-boundary reference would
///   dangle after the swap; rolled back
pub fn swap(conn: &mut Connection, group: SwapGroup, options: &SwapOptions) -> Result<SwapOutcome> {
    run_in_swap_transaction(conn, group, |tx| execute_swap(tx, group, options))
}

/// Run `body` inside the swap transaction of `group`
///
/// `body` receives the open transaction and may add its own statements (the
/// deployment record) to the same unit of work. The transaction commits only
/// if `body` returns `Ok`.
pub fn run_in_swap_transaction<T>(
    conn: &mut Connection,
    group: SwapGroup,
    body: impl FnOnce(&Transaction) -> Result<T>,
) -> Result<T> {
    log_op_start!("swap", group = group.name());
    let start = std::time::Instant::now();

    // Only failures after BEGIN are reclassified as rolled-back transactions
    let result = with_swap_pragmas(conn, |conn| {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| from_rusqlite(e).with_group(group.name()))?;
        let value = body(&tx).map_err(|err| in_transaction(group, err))?;
        tx.commit()
            .map_err(|e| in_transaction(group, from_rusqlite(e)))?;
        Ok(value)
    });

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => {
            log_op_end!("swap", duration_ms = duration_ms, group = group.name());
        }
        Err(err) => {
            log_op_error!("swap", err, duration_ms = duration_ms, group = group.name());
        }
    }
    result
}

/// Set `foreign_keys = OFF` and `legacy_alter_table = ON` around `f`
fn with_swap_pragmas<T>(
    conn: &mut Connection,
    f: impl FnOnce(&mut Connection) -> Result<T>,
) -> Result<T> {
    if !conn.is_autocommit() {
        return Err(internal(
            "swap",
            "a transaction is already open on this connection",
        ));
    }

    let fk_before: i64 = conn
        .pragma_query_value(None, "foreign_keys", |row| row.get(0))
        .map_err(from_rusqlite)?;
    let legacy_before: i64 = conn
        .pragma_query_value(None, "legacy_alter_table", |row| row.get(0))
        .map_err(from_rusqlite)?;

    conn.pragma_update(None, "foreign_keys", "OFF")
        .map_err(from_rusqlite)?;
    conn.pragma_update(None, "legacy_alter_table", "ON")
        .map_err(from_rusqlite)?;

    let result = f(conn);

    let restored = conn
        .pragma_update(None, "legacy_alter_table", legacy_before)
        .and_then(|()| conn.pragma_update(None, "foreign_keys", fk_before));
    // The transaction has already ended here; a restore failure must not
    // turn a committed swap into a reported failure.
    if let Err(e) = restored {
        tracing::warn!(error = %e, "Failed to restore connection pragmas after swap");
    }
    result
}
