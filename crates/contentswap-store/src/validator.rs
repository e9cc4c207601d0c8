//! Staging validator
//!
//! Preflight for a promotion: every table of the group must have a
//! non-empty `_staging` copy. Read-only; runs before any DDL.

use crate::catalog;
use crate::errors::Result;
use contentswap_core::errors::SwapError;
use contentswap_core::ident::PhysicalTable;
use contentswap_core::registry::SwapGroup;
use contentswap_core::{log_op_end, log_op_error, log_op_start};
use rusqlite::Connection;
use std::collections::BTreeMap;

/// Staging row counts keyed by logical table name
pub type StagingReport = BTreeMap<&'static str, u64>;

/// Validate the staging tables of one group
///
/// ## Errors
///
/// - `ExErrorKind::StagingMissing`: a `_staging` table does not exist
/// - `ExErrorKind::StagingEmpty`: a `_staging` table has no rows
/// - `ExErrorKind::Persistence`: the catalog could not be read
pub fn validate(conn: &Connection, group: SwapGroup) -> Result<StagingReport> {
    log_op_start!("validate_staging", group = group.name());
    let start = std::time::Instant::now();

    let result = validate_tables(conn, group);

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(report) => {
            log_op_end!(
                "validate_staging",
                duration_ms = duration_ms,
                group = group.name(),
                row_count = report.values().sum::<u64>()
            );
        }
        Err(err) => {
            log_op_error!(
                "validate_staging",
                err,
                duration_ms = duration_ms,
                group = group.name()
            );
        }
    }
    result
}

fn validate_tables(conn: &Connection, group: SwapGroup) -> Result<StagingReport> {
    let mut report = StagingReport::new();
    for table in group.tables() {
        let staging = PhysicalTable::staging(table.name);
        let staging_name = staging.name();

        if !catalog::table_exists(conn, &staging_name)? {
            return Err(SwapError::StagingMissing {
                group: group.name().to_string(),
                staging: staging_name,
            }
            .into());
        }

        let rows = catalog::row_count(conn, &staging_name)?;
        if rows == 0 {
            return Err(SwapError::StagingEmpty {
                group: group.name().to_string(),
                staging: staging_name,
            }
            .into());
        }

        tracing::debug!(group = group.name(), table = %staging, rows, "Staging table ready");
        report.insert(table.name.as_str(), rows);
    }
    Ok(report)
}

/// Validate several groups, stopping at the first failure
pub fn validate_all(
    conn: &Connection,
    groups: &[SwapGroup],
) -> Result<Vec<(SwapGroup, StagingReport)>> {
    groups
        .iter()
        .map(|group| validate(conn, *group).map(|report| (*group, report)))
        .collect()
}
