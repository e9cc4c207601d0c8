//! Staging recreator
//!
//! After a promotion the group has no staging tables left: they became live.
//! This module creates fresh, empty, writable `_staging` copies of each live
//! table so the next load has somewhere to write.

use crate::catalog;
use crate::errors::{from_rusqlite, internal, Result};
use contentswap_core::errors::SwapError;
use contentswap_core::ident::{quote_ident, PhysicalTable};
use contentswap_core::registry::SwapGroup;
use contentswap_core::{log_op_end, log_op_error, log_op_start};
use rusqlite::Connection;
use uuid::Uuid;

/// Marker separating an index's base name from its generation suffix
const INDEX_SUFFIX_MARKER: &str = "__s";
const INDEX_SUFFIX_LEN: usize = 8;

/// Recreate empty staging tables for every table of `group`
///
/// Drops any leftover `T_staging`, creates it from the live table's
/// definition, and clones the live table's explicit indexes under fresh
/// names. Triggers and rows are not copied. Returns the staging table names.
///
/// ## Errors
///
/// - `ExErrorKind::NotFound`: a live table of the group does not exist
/// - `ExErrorKind::Persistence`: a statement failed; nothing was changed
pub fn recreate_staging(conn: &mut Connection, group: SwapGroup) -> Result<Vec<String>> {
    log_op_start!("recreate_staging", group = group.name());
    let start = std::time::Instant::now();

    let result = recreate_in_transaction(conn, group);

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(created) => {
            log_op_end!(
                "recreate_staging",
                duration_ms = duration_ms,
                group = group.name(),
                tables = created.len()
            );
        }
        Err(err) => {
            log_op_error!(
                "recreate_staging",
                err,
                duration_ms = duration_ms,
                group = group.name()
            );
        }
    }
    result
}

fn recreate_in_transaction(conn: &mut Connection, group: SwapGroup) -> Result<Vec<String>> {
    let tx = conn.transaction().map_err(from_rusqlite)?;
    let created = recreate_tables(&tx, group)?;
    tx.commit().map_err(from_rusqlite)?;
    Ok(created)
}

fn recreate_tables(conn: &Connection, group: SwapGroup) -> Result<Vec<String>> {
    let mut created = Vec::with_capacity(group.tables().len());
    for table in group.tables() {
        let live = PhysicalTable::live(table.name);
        let staging = PhysicalTable::staging(table.name);

        let live_sql = catalog::table_sql(conn, &live.name())?.ok_or_else(|| {
            SwapError::LiveTableMissing {
                group: group.name().to_string(),
                table: live.name(),
            }
        })?;

        if catalog::table_exists(conn, &staging.name())? {
            conn.execute_batch(&format!("DROP TABLE {}", staging.quoted()))
                .map_err(from_rusqlite)?;
        }

        let create = retarget(&live_sql, &staging.quoted()).ok_or_else(|| {
            internal(
                "recreate_staging",
                format!("cannot parse definition of {}", live),
            )
        })?;
        conn.execute_batch(&create).map_err(from_rusqlite)?;

        let indexes = catalog::explicit_indexes(conn, &live.name())?;
        for index in &indexes {
            let Some(sql) = &index.sql else { continue };
            let Some(clone) = clone_index_sql(&index.name, sql, &staging.quoted()) else {
                continue;
            };
            conn.execute_batch(&clone).map_err(from_rusqlite)?;
        }

        tracing::debug!(
            group = group.name(),
            table = %staging,
            indexes = indexes.len(),
            "Recreated staging table"
        );
        created.push(staging.name());
    }
    Ok(created)
}

/// `CREATE TABLE <target> (...)` from an existing definition, keeping the
/// column list and any table options after it
fn retarget(table_sql: &str, target: &str) -> Option<String> {
    let open = table_sql.find('(')?;
    Some(format!("CREATE TABLE {} {}", target, &table_sql[open..]))
}

/// Base name of an index, without a generation suffix added by a clone
fn index_base_name(name: &str) -> &str {
    if let Some(pos) = name.rfind(INDEX_SUFFIX_MARKER) {
        let suffix = &name[pos + INDEX_SUFFIX_MARKER.len()..];
        if suffix.len() == INDEX_SUFFIX_LEN && suffix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return &name[..pos];
        }
    }
    name
}

/// Fresh index name: live and staging indexes coexist in one namespace
fn fresh_index_name(name: &str) -> String {
    let token = Uuid::now_v7().simple().to_string();
    format!(
        "{}{}{}",
        index_base_name(name),
        INDEX_SUFFIX_MARKER,
        &token[token.len() - INDEX_SUFFIX_LEN..]
    )
}

fn clone_index_sql(name: &str, index_sql: &str, target: &str) -> Option<String> {
    let open = index_sql.find('(')?;
    let unique = index_sql
        .get(..13)
        .is_some_and(|head| head.eq_ignore_ascii_case("CREATE UNIQUE"));
    Some(format!(
        "CREATE {}INDEX {} ON {} {}",
        if unique { "UNIQUE " } else { "" },
        quote_ident(&fresh_index_name(name)),
        target,
        &index_sql[open..]
    ))
}
