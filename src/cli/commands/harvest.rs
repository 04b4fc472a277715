//! Harvest command: feed listing pages through the re-queue policy.

use std::sync::Arc;

use console::style;

use crate::cli::helpers::format_number;
use crate::config::Settings;
use crate::scrape::HttpFetcher;
use crate::services::CrawlService;

pub async fn cmd_harvest(settings: &Settings, start_page: u32, pages: u32) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    let fetcher = Arc::new(HttpFetcher::new(settings)?);
    let service = CrawlService::new(ctx.clone(), fetcher, settings.clone());

    println!(
        "Harvesting {pages} listing pages starting at page {start_page}..."
    );
    let stats = service.harvest(start_page, pages).await?;

    println!("{} Harvest finished", style("✓").green());
    println!("  {:<10} {:>8}", "Queued:", format_number(stats.inserted));
    println!("  {:<10} {:>8}", "Re-queued:", format_number(stats.updated));
    println!("  {:<10} {:>8}", "Skipped:", format_number(stats.skipped));

    let snapshot = ctx.crawl().queue_snapshot()?;
    println!(
        "  {} pending in queue",
        format_number(snapshot.pending)
    );
    Ok(())
}
