//! History command

use crate::config::CliConfig;
use clap::Args;
use contentswap_core::registry::SwapGroup;
use contentswap_store::recorder;

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Group whose deployments to list
    pub group: String,
}

pub fn execute(config: &CliConfig, args: HistoryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let group: SwapGroup = args.group.parse()?;
    let conn = config.open_store()?;
    let records = recorder::history(&conn, group)?;

    if records.is_empty() {
        println!("{}: no deployments recorded", group);
        return Ok(());
    }

    for record in records {
        let promoted = record
            .promoted_at_utc()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {:<8} {:>8} rows  promoted {}",
            record.deployment_id,
            record.status.as_str(),
            record.row_count,
            promoted
        );
    }
    Ok(())
}
