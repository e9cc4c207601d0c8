//! Init command

use crate::config::CliConfig;

pub fn execute(config: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let conn = config.open_store()?;
    let applied = contentswap_store::migrations::applied_migrations(&conn)?;
    println!(
        "Initialized {} ({} migration(s) applied)",
        config.db.display(),
        applied.len()
    );
    Ok(())
}
