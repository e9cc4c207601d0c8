//! Promotion orchestration.
//!
//! ## Pipeline (in order):
//! 1. Validate the staging tables of every selected group (no DDL)
//! 2. dry_run short-circuit (no DDL, no records)
//! 3. Per group, one swap transaction: swap steps plus the `live` record
//! 4. Per group, recreate empty staging tables for the next load
//!
//! Groups are promoted one at a time in registry order. A failure stops the
//! run; groups already promoted in the same run stay promoted.

#![allow(clippy::result_large_err)]

use contentswap_core::errors::{ExError, ExErrorKind};
use contentswap_core::model::ContentDeployment;
use contentswap_core::registry::{GroupSelection, SwapGroup};
use contentswap_core::{log_op_end, log_op_error, log_op_start};
use contentswap_core_types::RunId;
use contentswap_store::errors::Result;
use contentswap_store::swap::{execute_swap, run_in_swap_transaction, SwapOptions, SwapOutcome};
use contentswap_store::{recorder, recreate_staging, validator, StagingReport};
use rusqlite::Connection;
use serde_json::{json, Map, Value};

/// Options for a promotion run.
#[derive(Debug, Clone)]
pub struct PromoteOptions {
    /// Validate only; report what would be promoted.
    pub dry_run: bool,
    /// Keep the previous live tables as `T_retired`.
    pub keep_retired: bool,
    /// Operator-supplied metadata merged into each deployment record.
    /// Must be a JSON object.
    pub metadata: Value,
}

impl Default for PromoteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            keep_retired: false,
            metadata: Value::Object(Map::new()),
        }
    }
}

/// What happened to one group.
#[derive(Debug, Clone)]
pub struct PromotionReport {
    pub group: SwapGroup,
    /// Staging row counts found by validation
    pub staging: StagingReport,
    pub dry_run: bool,
    /// Deployment record written in the swap transaction (None in dry-run)
    pub deployment: Option<ContentDeployment>,
    /// Swap details (None in dry-run)
    pub swap: Option<SwapOutcome>,
    /// Staging tables recreated after the swap
    pub staging_recreated: Vec<String>,
    /// Recreation failed after the swap committed; the group is live and
    /// `recreate_staging` can be rerun on its own
    pub staging_error: Option<ExError>,
}

impl PromotionReport {
    fn validated(group: SwapGroup, staging: StagingReport, dry_run: bool) -> Self {
        Self {
            group,
            staging,
            dry_run,
            deployment: None,
            swap: None,
            staging_recreated: Vec::new(),
            staging_error: None,
        }
    }

    /// Total staging rows across the group
    pub fn row_count(&self) -> u64 {
        self.staging.values().sum()
    }

    /// Summary for machine-readable output
    pub fn to_json(&self) -> Value {
        json!({
            "group": self.group.name(),
            "dry_run": self.dry_run,
            "row_count": self.row_count(),
            "tables": self.staging,
            "deployment_id": self.deployment.as_ref().map(|d| d.deployment_id.clone()),
            "retired_kept": self.swap.as_ref().map(|s| s.retired_kept.clone()).unwrap_or_default(),
            "foreign_keys_rebuilt": self
                .swap
                .as_ref()
                .map(|s| s.foreign_keys_rebuilt.clone())
                .unwrap_or_default(),
            "staging_recreated": self.staging_recreated,
            "staging_error": self.staging_error.as_ref().map(|e| e.to_string()),
        })
    }
}

/// Promote the selected groups from staging to live.
///
/// ## Arguments
///
/// - `conn`: Connection with migrations applied; no transaction open
/// - `selection`: One group or all of them
/// - `options`: Dry-run, retired-table and metadata options
///
/// ## Returns
///
/// One report per selected group, in registry order.
///
/// ## Errors
///
/// - `ExErrorKind::InvalidInput`: metadata is not a JSON object
/// - `ExErrorKind::StagingMissing` / `StagingEmpty`: validation failed; no
///   group was touched
/// - `ExErrorKind::Transaction` / `ConstraintViolation`: a swap rolled back;
///   groups earlier in the run remain promoted
///
/// A staging recreation failure after a committed swap is not an error of the
/// run: it is reported in [`PromotionReport::staging_error`].
pub fn promote(
    conn: &mut Connection,
    selection: GroupSelection,
    options: &PromoteOptions,
) -> Result<Vec<PromotionReport>> {
    let run_id = RunId::new();
    let groups = selection.groups();
    log_op_start!(
        "promote",
        run_id = run_id.as_str(),
        groups = groups.len(),
        dry_run = options.dry_run
    );
    let start = std::time::Instant::now();

    let result = promote_groups(conn, &run_id, &groups, options);

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(reports) => {
            log_op_end!(
                "promote",
                duration_ms = duration_ms,
                run_id = run_id.as_str(),
                groups = reports.len(),
                dry_run = options.dry_run
            );
        }
        Err(err) => {
            log_op_error!(
                "promote",
                err,
                duration_ms = duration_ms,
                run_id = run_id.as_str(),
                group = err.group().unwrap_or("")
            );
        }
    }
    result
}

fn promote_groups(
    conn: &mut Connection,
    run_id: &RunId,
    groups: &[SwapGroup],
    options: &PromoteOptions,
) -> Result<Vec<PromotionReport>> {
    let operator_metadata = operator_metadata(&options.metadata)?;

    // Fail fast: nothing is swapped unless every selected group is ready
    let validated = validator::validate_all(conn, groups)?;
    let mut reports: Vec<PromotionReport> = validated
        .into_iter()
        .map(|(group, staging)| PromotionReport::validated(group, staging, options.dry_run))
        .collect();

    if options.dry_run {
        for report in &reports {
            tracing::info!(
                run_id = run_id.as_str(),
                group = report.group.name(),
                row_count = report.row_count(),
                "Dry run: group would be promoted"
            );
        }
        return Ok(reports);
    }

    for report in &mut reports {
        promote_group(conn, run_id, report, &operator_metadata, options.keep_retired)?;
    }
    Ok(reports)
}

fn operator_metadata(metadata: &Value) -> Result<Map<String, Value>> {
    match metadata {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        other => Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("promote")
            .with_message(format!(
                "Deployment metadata must be a JSON object, got {}",
                other
            ))),
    }
}

/// Metadata stored on the deployment record: the operator's keys plus the
/// run id, per-table counts and the retired-table option.
fn record_metadata(
    operator: &Map<String, Value>,
    run_id: &RunId,
    staging: &StagingReport,
    keep_retired: bool,
) -> Value {
    let mut metadata = operator.clone();
    metadata.insert("run_id".into(), json!(run_id.as_str()));
    metadata.insert("tables".into(), json!(staging));
    metadata.insert("keep_retired".into(), json!(keep_retired));
    Value::Object(metadata)
}

fn promote_group(
    conn: &mut Connection,
    run_id: &RunId,
    report: &mut PromotionReport,
    operator: &Map<String, Value>,
    keep_retired: bool,
) -> Result<()> {
    let group = report.group;
    let row_count = report.row_count();
    let metadata = record_metadata(operator, run_id, &report.staging, keep_retired);
    let swap_options = SwapOptions { keep_retired };

    let (outcome, deployment) = run_in_swap_transaction(conn, group, |tx| {
        let outcome = execute_swap(tx, group, &swap_options)?;
        let deployment = recorder::record_promoted(tx, group, row_count, &metadata)?;
        Ok((outcome, deployment))
    })?;

    tracing::info!(
        run_id = run_id.as_str(),
        group = group.name(),
        deployment_id = %deployment.deployment_id,
        row_count,
        "Group promoted"
    );

    report.swap = Some(outcome);
    report.deployment = Some(deployment);
    record_recreate(report, recreate_staging(conn, group));
    Ok(())
}

fn record_recreate(report: &mut PromotionReport, result: Result<Vec<String>>) {
    match result {
        Ok(tables) => report.staging_recreated = tables,
        Err(err) => {
            tracing::warn!(
                group = report.group.name(),
                err_code = err.code(),
                error = %err,
                "Group is live but its staging tables were not recreated"
            );
            report.staging_error = Some(err);
        }
    }
}
