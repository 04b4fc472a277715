//! Backfill command: resolve relationship targets.

use console::style;

use crate::cli::helpers::format_number;
use crate::config::Settings;

pub fn cmd_backfill(settings: &Settings) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;

    let updated = ctx.relationships().backfill_unresolved()?;
    let remaining = ctx.relationships().unresolved_count()?;

    println!(
        "{} Resolved {} relationships, {} still waiting for their target",
        style("✓").green(),
        format_number(updated),
        format_number(remaining)
    );
    Ok(())
}
