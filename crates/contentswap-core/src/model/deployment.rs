//! ContentDeployment audit model
//!
//! One record per promotion of one swap group. Records move forward through
//! `staged` → `live` → `retired` and are never deleted.

use crate::errors::{ExError, ExErrorKind, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle state of a deployment record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Staged,
    Live,
    Retired,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Staged => "staged",
            DeploymentStatus::Live => "live",
            DeploymentStatus::Retired => "retired",
        }
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "staged" => Ok(DeploymentStatus::Staged),
            "live" => Ok(DeploymentStatus::Live),
            "retired" => Ok(DeploymentStatus::Retired),
            other => Err(ExError::new(ExErrorKind::Serialization)
                .with_op("parse_deployment_status")
                .with_message(format!("Unknown deployment status: {}", other))),
        }
    }
}

/// One row of the `content_deployments` audit trail
///
/// Timestamps are unix milliseconds, matching the column encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDeployment {
    pub deployment_id: String,
    pub group_name: String,
    pub status: DeploymentStatus,
    pub row_count: u64,
    pub metadata: serde_json::Value,
    pub staged_at: Option<i64>,
    pub promoted_at: Option<i64>,
    pub retired_at: Option<i64>,
}

impl ContentDeployment {
    pub fn promoted_at_utc(&self) -> Option<DateTime<Utc>> {
        self.promoted_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    pub fn is_live(&self) -> bool {
        self.status == DeploymentStatus::Live
    }
}
