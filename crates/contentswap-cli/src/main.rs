//! contentswap CLI
//!
//! Command-line interface for promoting staged content to live

use clap::{Parser, Subcommand};
use contentswap_core::logging_facility;

mod commands;
mod config;

use config::CliConfig;

#[derive(Debug, Parser)]
#[command(name = "contentswap")]
#[command(about = "contentswap - Blue-green content deployment", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: CliConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Promote staged content for one group or all groups
    Promote(commands::promote::PromoteArgs),
    /// Show the deployment history of a group
    History(commands::history::HistoryArgs),
    /// Rebuild empty staging tables for a live group
    Recreate(commands::recreate::RecreateArgs),
    /// Create the database and apply migrations
    Init,
}

fn main() {
    let cli = Cli::parse();
    logging_facility::init(cli.config.log);

    let result = match cli.command {
        Commands::Promote(args) => commands::promote::execute(&cli.config, args),
        Commands::History(args) => commands::history::execute(&cli.config, args),
        Commands::Recreate(args) => commands::recreate::execute(&cli.config, args),
        Commands::Init => commands::init::execute(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
