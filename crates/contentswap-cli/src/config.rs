//! CLI configuration
//!
//! Every setting is a global flag with an environment fallback, so the same
//! invocation works from a terminal and from a deployment pipeline.

use clap::Args;
use contentswap_core::errors::{ExError, ExErrorKind};
use contentswap_core::logging_facility::Profile;
use contentswap_store::errors::Result;
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Args)]
pub struct CliConfig {
    /// SQLite database holding live, staging and audit tables
    #[arg(
        long,
        global = true,
        env = "CONTENTSWAP_DB",
        default_value = ".contentswap/content.db"
    )]
    pub db: PathBuf,

    /// Log profile: development or production
    #[arg(long, global = true, env = "CONTENTSWAP_LOG", default_value = "development")]
    pub log: Profile,

    /// How long to wait for another writer before failing
    #[arg(
        long,
        global = true,
        env = "CONTENTSWAP_BUSY_TIMEOUT_MS",
        default_value_t = 5000
    )]
    pub busy_timeout_ms: u64,
}

impl CliConfig {
    /// Open and configure the database without touching its schema
    ///
    /// Used by read-only paths such as a dry run, which must not create the
    /// bookkeeping tables.
    pub fn open_connection(&self) -> Result<Connection> {
        if let Some(parent) = self.db.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ExError::new(ExErrorKind::Io)
                    .with_op("open_store")
                    .with_message(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }

        let conn = contentswap_store::db::open(&self.db)?;
        contentswap_store::db::configure(&conn, Duration::from_millis(self.busy_timeout_ms))?;
        tracing::debug!(db = %self.db.display(), "Opened content store");
        Ok(conn)
    }

    /// Open the database, configure the connection and apply migrations
    pub fn open_store(&self) -> Result<Connection> {
        let mut conn = self.open_connection()?;
        contentswap_store::migrations::apply_migrations(&mut conn)?;
        Ok(conn)
    }
}
