//! Cross-boundary foreign keys during a swap
//!
//! A foreign key from a table outside the group names the logical target
//! table. While the swap connection has `legacy_alter_table = ON` and
//! `foreign_keys = OFF`, renaming the target does not rewrite that clause, so
//! after the renames it resolves against the new live table. Keys that are
//! not declared yet are added by rebuilding the source table. Every key is
//! then checked against the new live rows before the transaction commits.

use crate::catalog;
use crate::errors::{step_failed, Result};
use contentswap_core::errors::SwapError;
use contentswap_core::ident::quote_ident;
use contentswap_core::log_swap_step;
use contentswap_core::registry::{CrossForeignKey, SwapGroup};
use rusqlite::Connection;

const RELEASE_STEP: &str = "release_foreign_keys";
const RESTORE_STEP: &str = "restore_foreign_keys";

/// What step 3 found for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// The referencing table does not exist; nothing to keep consistent
    SourceAbsent,
    /// The clause exists and survives the renames untouched
    Declared,
    /// The clause is missing and must be added after the renames
    Undeclared,
}

#[derive(Debug, Clone, Copy)]
pub struct ReleasedKey {
    pub key: CrossForeignKey,
    pub state: KeyState,
}

/// Classify every cross-boundary key of the group
pub fn release(conn: &Connection, group: SwapGroup) -> Result<Vec<ReleasedKey>> {
    let mut released = Vec::with_capacity(group.foreign_keys().len());
    for key in group.foreign_keys() {
        let state = classify(conn, key)?;
        match state {
            KeyState::SourceAbsent => tracing::warn!(
                group = group.name(),
                constraint = key.name.as_str(),
                source_table = key.source_table.as_str(),
                "Foreign key source table does not exist; skipping"
            ),
            _ => {
                log_swap_step!(
                    RELEASE_STEP,
                    group = group.name(),
                    constraint = key.name.as_str(),
                    state = ?state
                );
            }
        }
        released.push(ReleasedKey { key: *key, state });
    }
    Ok(released)
}

fn classify(conn: &Connection, key: &CrossForeignKey) -> Result<KeyState> {
    if !catalog::table_exists(conn, key.source_table.as_str())? {
        return Ok(KeyState::SourceAbsent);
    }
    let declared = catalog::foreign_keys(conn, key.source_table.as_str())?
        .into_iter()
        .any(|fk| {
            fk.target_table == key.target_table.as_str()
                && fk.source_column == key.source_column.as_str()
        });
    Ok(if declared {
        KeyState::Declared
    } else {
        KeyState::Undeclared
    })
}

/// Add missing keys, then check every key against the new live table
///
/// Returns the names of the keys that were added.
///
/// ## Errors
///
/// - `ExErrorKind::Transaction`: rebuilding a source table failed
/// - `ExErrorKind::ConstraintViolation`: rows reference target rows that the
///   new live table lacks
pub fn restore(
    conn: &Connection,
    group: SwapGroup,
    released: &[ReleasedKey],
) -> Result<Vec<&'static str>> {
    let mut rebuilt = Vec::new();
    for entry in released {
        let key = entry.key;
        match entry.state {
            KeyState::SourceAbsent => continue,
            KeyState::Declared => {}
            KeyState::Undeclared => {
                rebuild_with_key(conn, group, &key)?;
                rebuilt.push(key.name.as_str());
            }
        }

        let violations = catalog::dangling_references(
            conn,
            key.source_table.as_str(),
            key.target_table.as_str(),
        )?;
        if violations > 0 {
            return Err(SwapError::DanglingReferences {
                group: group.name().to_string(),
                source_table: key.source_table.to_string(),
                target_table: key.target_table.to_string(),
                violations,
            }
            .into());
        }
        log_swap_step!(
            RESTORE_STEP,
            group = group.name(),
            constraint = key.name.as_str(),
            rebuilt = matches!(entry.state, KeyState::Undeclared)
        );
    }
    Ok(rebuilt)
}

/// Recreate `key.source_table` with the key's constraint appended
///
/// SQLite cannot add a constraint to an existing table, so this follows the
/// create, copy, drop, rename procedure and replays the table's indexes and
/// triggers afterwards.
fn rebuild_with_key(conn: &Connection, group: SwapGroup, key: &CrossForeignKey) -> Result<()> {
    let source = key.source_table.as_str();
    let scratch = format!("{}__rebuild", source);

    let table_sql = catalog::table_sql(conn, source)?.ok_or_else(|| {
        crate::errors::internal(RESTORE_STEP, format!("table {} vanished mid-swap", source))
    })?;
    let indexes = catalog::explicit_indexes(conn, source)?;
    let triggers = catalog::triggers_on(conn, source)?;

    let create = with_constraint(&table_sql, &scratch, key)?;
    let run = |sql: &str| {
        conn.execute_batch(sql)
            .map_err(|e| step_failed(group, RESTORE_STEP, e))
    };

    run(&create)?;
    run(&format!(
        "INSERT INTO {} SELECT * FROM {}",
        quote_ident(&scratch),
        quote_ident(source)
    ))?;
    run(&format!("DROP TABLE {}", quote_ident(source)))?;
    run(&format!(
        "ALTER TABLE {} RENAME TO {}",
        quote_ident(&scratch),
        quote_ident(source)
    ))?;
    for object in indexes.iter().chain(triggers.iter()) {
        if let Some(sql) = &object.sql {
            run(sql)?;
        }
    }

    tracing::info!(
        group = group.name(),
        constraint = key.name.as_str(),
        table = source,
        indexes = indexes.len(),
        triggers = triggers.len(),
        "Added foreign key by rebuilding table"
    );
    Ok(())
}

/// `CREATE TABLE` text for `new_name` with the key's constraint appended
/// before the closing parenthesis of the column list
fn with_constraint(table_sql: &str, new_name: &str, key: &CrossForeignKey) -> Result<String> {
    let open = table_sql.find('(');
    let close = table_sql.rfind(')');
    let (open, close) = match (open, close) {
        (Some(open), Some(close)) if open < close => (open, close),
        _ => {
            return Err(crate::errors::internal(
                RESTORE_STEP,
                format!("cannot parse definition of {}", key.source_table),
            ))
        }
    };

    Ok(format!(
        "CREATE TABLE {} {}, CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}){}",
        quote_ident(new_name),
        &table_sql[open..close],
        key.name.quoted(),
        key.source_column.quoted(),
        key.target_table.quoted(),
        key.target_column.quoted(),
        &table_sql[close..]
    ))
}
