//! Database connection management
//!
//! Provides utilities for opening and configuring SQLite connections, and a
//! savepoint helper usable both inside and outside an open transaction.

use crate::errors::{from_rusqlite, Result};
use contentswap_core::quote_ident;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Configure a connection for serving and promoting content
///
/// WAL lets readers keep reading the pre-swap schema while the swap
/// transaction holds the write lock; the busy timeout bounds how long a
/// writer queues behind it.
pub fn configure(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(from_rusqlite)?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(from_rusqlite)?;
    conn.busy_timeout(busy_timeout).map_err(from_rusqlite)?;
    Ok(())
}

/// Run `f` inside a named savepoint
///
/// Released on success, rolled back on error. Unlike a transaction, a
/// savepoint nests inside whatever transaction is already open on `conn`.
pub fn with_savepoint<T>(
    conn: &Connection,
    name: &str,
    f: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    let quoted = quote_ident(name);
    conn.execute_batch(&format!("SAVEPOINT {}", quoted))
        .map_err(from_rusqlite)?;
    match f(conn) {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {}", quoted))
                .map_err(from_rusqlite)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) =
                conn.execute_batch(&format!("ROLLBACK TO {0}; RELEASE {0}", quoted))
            {
                tracing::warn!(savepoint = name, error = %rollback_err, "Savepoint rollback failed");
            }
            Err(err)
        }
    }
}
