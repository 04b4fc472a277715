//! Glossary command: crawl the term catalog.

use std::sync::Arc;

use crate::cli::helpers::print_session_summary;
use crate::config::Settings;
use crate::scrape::HttpFetcher;
use crate::services::CrawlService;

pub async fn cmd_glossary(settings: &Settings, pages: u32) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    let fetcher = Arc::new(HttpFetcher::new(settings)?);
    let service = CrawlService::new(ctx, fetcher, settings.clone());

    println!("Crawling {pages} glossary pages...");
    let session = service.crawl_glossary(pages).await?;

    print_session_summary(&session);
    Ok(())
}
