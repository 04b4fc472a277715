//! Status command for showing system state.

use chrono::Local;
use console::style;

use crate::cli::helpers::{format_number, styled_status};
use crate::config::Settings;

/// Show overall system status.
pub fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;

    let snapshot = ctx.crawl().queue_snapshot()?;
    let documents = ctx.documents().document_count()?;
    let versions = ctx.documents().version_count()?;
    let edges = ctx.relationships().edge_count()?;
    let unresolved = ctx.relationships().unresolved_count()?;
    let terms = ctx.terms().count()?;

    let now = Local::now();
    let separator = "─".repeat(60);

    println!();
    println!(
        "{:<40} Last updated: {}",
        style("lexacquire status").bold(),
        now.format("%Y-%m-%d %H:%M:%S")
    );
    println!("{separator}");
    println!("Database: {}", settings.database_path().display());
    println!();

    println!("{}", style("QUEUE").cyan().bold());
    println!("  {:<20} {:>10}", "Pending:", format_number(snapshot.pending));
    println!("  {:<20} {:>10}", "In flight:", format_number(snapshot.crawled));
    println!(
        "  {:<20} {:>10}",
        "Completed:",
        format_number(snapshot.completed)
    );
    println!("  {:<20} {:>10}", "Failed:", format_number(snapshot.failed));
    println!();

    println!("{}", style("DOCUMENTS").cyan().bold());
    println!("  {:<20} {:>10}", "Documents:", format_number(documents));
    println!("  {:<20} {:>10}", "Versions:", format_number(versions));
    println!();

    println!("{}", style("RELATIONSHIPS").cyan().bold());
    println!("  {:<20} {:>10}", "Edges:", format_number(edges));
    println!("  {:<20} {:>10}", "Unresolved:", format_number(unresolved));
    println!();

    println!("{}", style("CATALOG").cyan().bold());
    println!("  {:<20} {:>10}", "Terms:", format_number(terms));
    println!();

    let recent = ctx.sessions().recent(5)?;
    if !recent.is_empty() {
        println!("{}", style("RECENT SESSIONS").cyan().bold());
        for session in recent {
            println!(
                "  #{:<4} {:<10} {} total={} new={} updated={} unchanged={} failed={}",
                session.session_id,
                styled_status(session.status),
                session.started_at.format("%Y-%m-%d %H:%M"),
                session.total_items,
                session.new_items,
                session.updated_items,
                session.unchanged_items,
                session.failed_items,
            );
        }
    }

    Ok(())
}
