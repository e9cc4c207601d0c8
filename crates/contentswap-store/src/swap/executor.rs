//! The ordered steps of one swap
//!
//! Every step runs on the connection of the open swap transaction. Catalog
//! lookups decide which statements are needed; no statement is issued with
//! its failure ignored.

use super::foreign_keys::{self, KeyState};
use super::guard::WriteGuard;
use super::{SwapOptions, SwapOutcome, TableSwap};
use crate::catalog;
use crate::errors::{internal, step_failed, Result};
use contentswap_core::ident::PhysicalTable;
use contentswap_core::log_swap_step;
use contentswap_core::registry::SwapGroup;
use rusqlite::Connection;

pub(crate) const STEP_CLEAR_STALE: &str = "clear_stale_retired";
pub(crate) const STEP_GUARD_SUPPORT: &str = "ensure_guard_support";
pub(crate) const STEP_DISABLE_GUARDS: &str = "disable_write_guards";
pub(crate) const STEP_RELEASE_KEYS: &str = "release_foreign_keys";
pub(crate) const STEP_RENAME: &str = "rename_tables";
pub(crate) const STEP_ENABLE_GUARDS: &str = "enable_write_guards";
pub(crate) const STEP_DROP_RETIRED: &str = "drop_retired";

/// Run steps 0 through 7 for `group`
///
/// The caller owns the transaction: an error returned from here must lead to
/// a rollback, never a commit.
pub fn execute_swap(
    conn: &Connection,
    group: SwapGroup,
    options: &SwapOptions,
) -> Result<SwapOutcome> {
    let mut outcome = SwapOutcome::new(group);

    outcome.stale_retired_dropped = clear_stale_retired(conn, group)?;
    let guards = ensure_guard_support(group);
    disable_write_guards(conn, group, &guards)?;

    let released = release_foreign_keys(conn, group)?;
    outcome.foreign_keys_skipped = released
        .iter()
        .filter(|k| k.state == KeyState::SourceAbsent)
        .map(|k| k.key.name.as_str())
        .collect();

    outcome.tables = rename_tables(conn, group)?;
    outcome.foreign_keys_rebuilt = foreign_keys::restore(conn, group, &released)?;
    enable_write_guards(conn, group, &guards)?;

    let retired = outcome
        .tables
        .iter()
        .filter(|t| t.had_live)
        .map(|t| t.retired.clone());
    if options.keep_retired {
        outcome.retired_kept = retired.collect();
    } else {
        outcome.retired_dropped = drop_retired(conn, group, retired.rev())?;
    }

    Ok(outcome)
}

fn exec(conn: &Connection, group: SwapGroup, step: &str, sql: &str) -> Result<()> {
    conn.execute_batch(sql)
        .map_err(|e| step_failed(group, step, e))
}

/// Step 0: a retired table kept by an earlier promotion would block the rename
fn clear_stale_retired(conn: &Connection, group: SwapGroup) -> Result<Vec<String>> {
    let mut dropped = Vec::new();
    for table in group.tables().iter().rev() {
        let retired = PhysicalTable::retired(table.name);
        if catalog::table_exists(conn, &retired.name())? {
            exec(
                conn,
                group,
                STEP_CLEAR_STALE,
                &format!("DROP TABLE {}", retired.quoted()),
            )?;
            log_swap_step!(STEP_CLEAR_STALE, group = group.name(), table = %retired);
            dropped.push(retired.name());
        }
    }
    Ok(dropped)
}

/// Step 1: the guard body is a `RAISE` expression, so there is no shared
/// trigger function to install; build the per-table guards.
fn ensure_guard_support(group: SwapGroup) -> Vec<WriteGuard> {
    let guards: Vec<WriteGuard> = group.tables().iter().copied().map(WriteGuard::new).collect();
    for guard in &guards {
        log_swap_step!(STEP_GUARD_SUPPORT, group = group.name(), body = %guard.body_sql());
    }
    guards
}

/// Step 2: drop the guard triggers of the current live tables, where present
fn disable_write_guards(conn: &Connection, group: SwapGroup, guards: &[WriteGuard]) -> Result<()> {
    for (table, guard) in group.tables().iter().zip(guards) {
        if !catalog::table_exists(conn, table.name.as_str())? {
            continue;
        }
        for trigger in guard.trigger_names() {
            if catalog::trigger_exists(conn, &trigger)? {
                exec(conn, group, STEP_DISABLE_GUARDS, &WriteGuard::drop_sql(&trigger))?;
                log_swap_step!(STEP_DISABLE_GUARDS, group = group.name(), trigger = %trigger);
            }
        }
    }
    Ok(())
}

/// Step 3: classify cross-boundary keys under the rename pragmas
fn release_foreign_keys(
    conn: &Connection,
    group: SwapGroup,
) -> Result<Vec<foreign_keys::ReleasedKey>> {
    let fk_enforced = catalog::pragma_flag(conn, "foreign_keys")?;
    let legacy_rename = catalog::pragma_flag(conn, "legacy_alter_table")?;
    if fk_enforced != 0 || legacy_rename != 1 {
        return Err(internal(
            STEP_RELEASE_KEYS,
            format!(
                "swap connection not prepared (foreign_keys={}, legacy_alter_table={})",
                fk_enforced, legacy_rename
            ),
        ));
    }
    foreign_keys::release(conn, group)
}

/// Step 4: live becomes retired, staging becomes live
fn rename_tables(conn: &Connection, group: SwapGroup) -> Result<Vec<TableSwap>> {
    let mut swapped = Vec::with_capacity(group.tables().len());
    for table in group.tables() {
        let live = PhysicalTable::live(table.name);
        let staging = PhysicalTable::staging(table.name);
        let retired = PhysicalTable::retired(table.name);

        let had_live = catalog::table_exists(conn, &live.name())?;
        if had_live {
            exec(
                conn,
                group,
                STEP_RENAME,
                &format!("ALTER TABLE {} RENAME TO {}", live.quoted(), retired.quoted()),
            )?;
        }
        exec(
            conn,
            group,
            STEP_RENAME,
            &format!("ALTER TABLE {} RENAME TO {}", staging.quoted(), live.quoted()),
        )?;
        let rows = catalog::row_count(conn, &live.name())?;

        log_swap_step!(
            STEP_RENAME,
            group = group.name(),
            table = %live,
            had_live,
            rows
        );
        swapped.push(TableSwap {
            table: table.name.as_str(),
            had_live,
            rows,
            retired: retired.name(),
        });
    }
    Ok(swapped)
}

/// Step 6: attach the guard triggers to the new live tables
fn enable_write_guards(conn: &Connection, group: SwapGroup, guards: &[WriteGuard]) -> Result<()> {
    for guard in guards {
        for sql in guard.create_sql() {
            exec(conn, group, STEP_ENABLE_GUARDS, &sql)?;
        }
        log_swap_step!(
            STEP_ENABLE_GUARDS,
            group = group.name(),
            triggers = ?guard.trigger_names()
        );
    }
    Ok(())
}

/// Step 7: drop the previous live tables, dependants first
fn drop_retired(
    conn: &Connection,
    group: SwapGroup,
    retired: impl Iterator<Item = String>,
) -> Result<Vec<String>> {
    let mut dropped = Vec::new();
    for name in retired {
        exec(
            conn,
            group,
            STEP_DROP_RETIRED,
            &format!("DROP TABLE {}", contentswap_core::quote_ident(&name)),
        )?;
        log_swap_step!(STEP_DROP_RETIRED, group = group.name(), table = %name);
        dropped.push(name);
    }
    Ok(dropped)
}
