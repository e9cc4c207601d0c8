//! Promote command

use crate::config::CliConfig;
use clap::Args;
use contentswap_core::registry::GroupSelection;
use contentswap_engine::commands::promote::{promote, PromoteOptions, PromotionReport};

#[derive(Debug, Args)]
pub struct PromoteArgs {
    /// Group to promote: patterns, rules, tour or all
    pub group: String,

    /// Validate staging and report counts without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Keep the previous live tables as <table>_retired
    #[arg(long)]
    pub keep_retired: bool,

    /// JSON object stored with the deployment record
    #[arg(long, value_parser = parse_metadata)]
    pub metadata: Option<serde_json::Value>,

    /// Print one JSON object per group instead of text
    #[arg(long)]
    pub json: bool,
}

fn parse_metadata(raw: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {}", e))
}

pub fn execute(config: &CliConfig, args: PromoteArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Parsed here, not by clap: an unknown group must exit 1, not 2
    let selection: GroupSelection = args.group.parse()?;
    // Validation only reads the catalog and staging tables
    let mut conn = if args.dry_run {
        config.open_connection()?
    } else {
        config.open_store()?
    };

    let options = PromoteOptions {
        dry_run: args.dry_run,
        keep_retired: args.keep_retired,
        metadata: args.metadata.unwrap_or_else(|| serde_json::json!({})),
    };

    let reports = promote(&mut conn, selection, &options)?;

    for report in &reports {
        if args.json {
            println!("{}", report.to_json());
        } else {
            print_report(report);
        }
        if let Some(err) = &report.staging_error {
            eprintln!(
                "Warning: {} is live but its staging tables were not recreated: {}",
                report.group, err
            );
            eprintln!("Run `contentswap recreate {}` before the next load", report.group);
        }
    }
    Ok(())
}

fn print_report(report: &PromotionReport) {
    if report.dry_run {
        println!(
            "[dry-run] {}: {} row(s) staged, would promote",
            report.group,
            report.row_count()
        );
    } else {
        println!("{}: promoted {} row(s)", report.group, report.row_count());
    }
    for (table, rows) in &report.staging {
        println!("  {:<20} {}", table, rows);
    }
    if let Some(deployment) = &report.deployment {
        println!("  deployment_id: {}", deployment.deployment_id);
    }
    if let Some(outcome) = &report.swap {
        for name in &outcome.retired_kept {
            println!("  kept: {}", name);
        }
        for key in &outcome.foreign_keys_rebuilt {
            println!("  added foreign key: {}", key);
        }
    }
}
