//! Init command: create the data directory and database.

use console::style;

use crate::config::Settings;

pub fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    settings.create_db_context()?;

    println!("{} Initialized", style("✓").green());
    println!("  Data dir: {}", settings.data_dir.display());
    println!("  Database: {}", settings.database_path().display());
    Ok(())
}
