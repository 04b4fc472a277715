//! Row parsing helpers for the crawl repository.

use crate::models::{CrawlUrl, UrlStatus};
use crate::repository::{parse_date_opt, parse_datetime, parse_datetime_opt};

/// Parse a database row into a CrawlUrl.
pub fn row_to_crawl_url(row: &rusqlite::Row) -> rusqlite::Result<CrawlUrl> {
    Ok(CrawlUrl {
        id: row.get("id")?,
        url: row.get("url")?,
        doc_id: row.get("doc_id")?,
        title: row.get("title")?,
        last_update_date: parse_date_opt(row.get("last_update_date")?),
        status: UrlStatus::from_str(&row.get::<_, String>("status")?)
            .unwrap_or(UrlStatus::Pending),
        priority: row.get("priority")?,
        retry_count: row.get::<_, i64>("retry_count")? as u32,
        last_error: row.get("last_error")?,
        discovered_at: parse_datetime(&row.get::<_, String>("discovered_at")?),
        last_crawled_at: parse_datetime_opt(row.get("last_crawled_at")?),
    })
}
