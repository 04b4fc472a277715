//! Sessions command: list crawl sessions, clean up stale ones.

use console::style;

use crate::cli::helpers::{format_number, styled_status};
use crate::config::Settings;

pub fn cmd_sessions(settings: &Settings, cleanup: bool, limit: u32) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    let sessions = ctx.sessions();

    if cleanup {
        let closed = sessions.fail_stale(settings.stale_session_secs)?;
        if closed > 0 {
            println!(
                "{} Closed {} stale sessions",
                style("✓").green(),
                format_number(closed)
            );
        } else {
            println!("{} No stale sessions", style("✓").green());
        }
    }

    let recent = sessions.recent(limit)?;
    if recent.is_empty() {
        println!("No sessions recorded yet");
        return Ok(());
    }

    println!(
        "{:<6} {:<10} {:<20} {:>7} {:>6} {:>8} {:>10} {:>7}",
        "ID", "STATUS", "STARTED", "TOTAL", "NEW", "UPDATED", "UNCHANGED", "FAILED"
    );
    for session in recent {
        println!(
            "{:<6} {:<10} {:<20} {:>7} {:>6} {:>8} {:>10} {:>7}",
            session.session_id,
            styled_status(session.status),
            session.started_at.format("%Y-%m-%d %H:%M:%S"),
            session.total_items,
            session.new_items,
            session.updated_items,
            session.unchanged_items,
            session.failed_items,
        );
    }
    Ok(())
}
