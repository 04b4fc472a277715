//! Crawl command: process pending documents inside a session.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::cli::helpers::print_session_summary;
use crate::config::Settings;
use crate::scrape::HttpFetcher;
use crate::services::{CrawlEvent, CrawlService};

pub async fn cmd_crawl(settings: &Settings, limit: u64, workers: usize) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    let fetcher = Arc::new(HttpFetcher::new(settings)?);
    let service = CrawlService::new(ctx, fetcher, settings.clone());

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner} {pos} processed {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.enable_steady_tick(Duration::from_millis(120));

    let (tx, mut rx) = mpsc::channel(64);
    let bar = progress.clone();
    let consumer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                CrawlEvent::Started { url, .. } => bar.set_message(url),
                CrawlEvent::Finished { .. } => bar.inc(1),
            }
        }
    });

    let session = service.crawl_pending(limit, workers, tx).await?;
    let _ = consumer.await;
    progress.finish_and_clear();

    print_session_summary(&session);
    Ok(())
}
