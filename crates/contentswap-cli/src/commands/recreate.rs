//! Recreate command

use crate::config::CliConfig;
use clap::Args;
use contentswap_core::registry::SwapGroup;
use contentswap_store::recreate_staging;

#[derive(Debug, Args)]
pub struct RecreateArgs {
    /// Group whose empty staging tables to rebuild from the live tables
    pub group: String,
}

pub fn execute(config: &CliConfig, args: RecreateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let group: SwapGroup = args.group.parse()?;
    let mut conn = config.open_store()?;
    let created = recreate_staging(&mut conn, group)?;
    println!("{}: recreated {}", group, created.join(", "));
    Ok(())
}
