//! Deployment recorder
//!
//! Writes the `content_deployments` audit trail. Functions take a plain
//! `&Connection` so the promotion can call them on the open swap transaction:
//! a record only says `live` if the swap that made it live committed.

#![allow(clippy::result_large_err)]

use crate::db::with_savepoint;
use crate::errors::{from_rusqlite, Result};
use contentswap_core::errors::{ExError, ExErrorKind};
use contentswap_core::model::{ContentDeployment, DeploymentStatus};
use contentswap_core::registry::SwapGroup;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const SELECT_COLUMNS: &str = "deployment_id, group_name, status, row_count, metadata, \
                              staged_at, promoted_at, retired_at";

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn row_to_deployment(row: &Row<'_>) -> rusqlite::Result<ContentDeployment> {
    let status: String = row.get(2)?;
    let status = status.parse::<DeploymentStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let row_count: i64 = row.get(3)?;
    Ok(ContentDeployment {
        deployment_id: row.get(0)?,
        group_name: row.get(1)?,
        status,
        row_count: row_count.max(0) as u64,
        metadata: row.get(4)?,
        staged_at: row.get(5)?,
        promoted_at: row.get(6)?,
        retired_at: row.get(7)?,
    })
}

fn row_count_param(row_count: u64) -> Result<i64> {
    i64::try_from(row_count).map_err(|_| {
        ExError::new(ExErrorKind::InvalidInput)
            .with_op("record_deployment")
            .with_message(format!("row count {} out of range", row_count))
    })
}

fn find(conn: &Connection, deployment_id: &str) -> Result<ContentDeployment> {
    conn.query_row(
        &format!(
            "SELECT {} FROM content_deployments WHERE deployment_id = ?1",
            SELECT_COLUMNS
        ),
        [deployment_id],
        row_to_deployment,
    )
    .map_err(from_rusqlite)
}

/// Insert a `staged` record for content a loader has finished writing
pub fn record_staged(
    conn: &Connection,
    group: SwapGroup,
    row_count: u64,
    metadata: &serde_json::Value,
) -> Result<ContentDeployment> {
    let deployment_id = Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO content_deployments
            (deployment_id, group_name, status, row_count, metadata, staged_at)
         VALUES (?1, ?2, 'staged', ?3, ?4, ?5)",
        params![
            deployment_id,
            group.name(),
            row_count_param(row_count)?,
            metadata,
            now_ms()
        ],
    )
    .map_err(from_rusqlite)?;

    tracing::debug!(group = group.name(), deployment_id = %deployment_id, "Recorded staged deployment");
    find(conn, &deployment_id)
}

/// Record that `group` just went live
///
/// The newest record of the group is promoted if it is still `staged`;
/// otherwise a new `live` record is inserted. Every other `live` record of
/// the group becomes `retired`, so at most one record per group is live.
///
/// ## Errors
///
/// - `ExErrorKind::Persistence`: the audit table is missing or a write failed
pub fn record_promoted(
    conn: &Connection,
    group: SwapGroup,
    row_count: u64,
    metadata: &serde_json::Value,
) -> Result<ContentDeployment> {
    let rows = row_count_param(row_count)?;
    with_savepoint(conn, "record_promoted", |conn| {
        let now = now_ms();
        let newest: Option<(String, String)> = conn
            .query_row(
                "SELECT deployment_id, status FROM content_deployments
                 WHERE group_name = ?1 ORDER BY id DESC LIMIT 1",
                [group.name()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(from_rusqlite)?;

        let deployment_id = match newest {
            Some((id, status)) if status == DeploymentStatus::Staged.as_str() => {
                conn.execute(
                    "UPDATE content_deployments
                     SET status = 'live', row_count = ?2, metadata = ?3, promoted_at = ?4
                     WHERE deployment_id = ?1",
                    params![id, rows, metadata, now],
                )
                .map_err(from_rusqlite)?;
                id
            }
            _ => {
                let id = Uuid::now_v7().to_string();
                conn.execute(
                    "INSERT INTO content_deployments
                        (deployment_id, group_name, status, row_count, metadata, promoted_at)
                     VALUES (?1, ?2, 'live', ?3, ?4, ?5)",
                    params![id, group.name(), rows, metadata, now],
                )
                .map_err(from_rusqlite)?;
                id
            }
        };

        let retired = conn
            .execute(
                "UPDATE content_deployments
                 SET status = 'retired', retired_at = ?3
                 WHERE group_name = ?1 AND status = 'live' AND deployment_id <> ?2",
                params![group.name(), deployment_id, now],
            )
            .map_err(from_rusqlite)?;

        tracing::info!(
            group = group.name(),
            deployment_id = %deployment_id,
            row_count,
            retired,
            "Recorded live deployment"
        );
        find(conn, &deployment_id)
    })
}

/// Every record of `group`, newest first
pub fn history(conn: &Connection, group: SwapGroup) -> Result<Vec<ContentDeployment>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM content_deployments WHERE group_name = ?1 ORDER BY id DESC",
            SELECT_COLUMNS
        ))
        .map_err(from_rusqlite)?;
    let records = stmt
        .query_map([group.name()], row_to_deployment)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(records)
}

/// The record currently marked live for `group`
pub fn current_live(conn: &Connection, group: SwapGroup) -> Result<Option<ContentDeployment>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM content_deployments
             WHERE group_name = ?1 AND status = 'live' ORDER BY id DESC LIMIT 1",
            SELECT_COLUMNS
        ),
        [group.name()],
        row_to_deployment,
    )
    .optional()
    .map_err(from_rusqlite)
}
