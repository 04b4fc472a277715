//! Crawl queue models for tracking discovered URLs.

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Crawl status of a discovered URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlStatus {
    /// Queued for fetching.
    Pending,
    /// Claimed by a worker, fetch in flight.
    Crawled,
    /// Fetched and persisted.
    Completed,
    /// Fetch or persist failed; eligible for retry.
    Failed,
}

impl UrlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Crawled => "crawled",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "crawled" => Some(Self::Crawled),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A discovered document URL and its crawl state.
///
/// One row exists per canonical URL. Re-sightings during link harvesting
/// run through the upsert policy in the crawl repository rather than
/// mutating these fields directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlUrl {
    /// Database row ID.
    pub id: i64,
    /// Canonical document URL (globally unique).
    pub url: String,
    /// Site identifier extracted from the URL tail, if present.
    pub doc_id: Option<String>,
    /// Document title as reported by the listing page.
    pub title: String,
    /// Site-reported last update date, if the listing carried one.
    pub last_update_date: Option<NaiveDate>,
    /// Current crawl status.
    pub status: UrlStatus,
    /// Fetch ordering; higher is crawled sooner.
    pub priority: i64,
    /// Consecutive failed attempts.
    pub retry_count: u32,
    /// Last failure message, if any.
    pub last_error: Option<String>,
    /// When the URL was first seen.
    pub discovered_at: DateTime<Utc>,
    /// When the URL was last fetched, if ever.
    pub last_crawled_at: Option<DateTime<Utc>>,
}

impl CrawlUrl {
    /// Create a freshly discovered URL entry.
    pub fn discovered(url: &str, title: &str, last_update_date: Option<NaiveDate>) -> Self {
        Self {
            id: 0, // Set by database
            doc_id: extract_doc_id(url),
            url: url.to_string(),
            title: title.to_string(),
            last_update_date,
            status: UrlStatus::Pending,
            priority: 0,
            retry_count: 0,
            last_error: None,
            discovered_at: Utc::now(),
            last_crawled_at: None,
        }
    }
}

/// Extract the numeric document identifier from a detail-page URL.
///
/// Detail URLs end in `-<digits>.aspx`; everything else has no identifier.
pub fn extract_doc_id(url: &str) -> Option<String> {
    static DOC_ID: OnceLock<Regex> = OnceLock::new();
    let re = DOC_ID.get_or_init(|| Regex::new(r"-(\d+)\.aspx$").unwrap());
    re.captures(url).map(|c| c[1].to_string())
}

/// Parse a site-reported `DD/MM/YYYY` date.
pub fn parse_site_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_status_roundtrip() {
        for status in [
            UrlStatus::Pending,
            UrlStatus::Crawled,
            UrlStatus::Completed,
            UrlStatus::Failed,
        ] {
            assert_eq!(UrlStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_url_status_from_invalid() {
        assert_eq!(UrlStatus::from_str("fetched"), None);
        assert_eq!(UrlStatus::from_str(""), None);
    }

    #[test]
    fn test_extract_doc_id() {
        assert_eq!(
            extract_doc_id("https://example.vn/van-ban/nghi-dinh-15-2025-nd-cp-637214.aspx"),
            Some("637214".to_string())
        );
        assert_eq!(extract_doc_id("https://example.vn/van-ban/index.aspx"), None);
        assert_eq!(extract_doc_id("https://example.vn/page?id=3"), None);
    }

    #[test]
    fn test_parse_site_date() {
        assert_eq!(
            parse_site_date("05/02/2025"),
            NaiveDate::from_ymd_opt(2025, 2, 5)
        );
        assert_eq!(
            parse_site_date(" 31/12/2024 "),
            NaiveDate::from_ymd_opt(2024, 12, 31)
        );
        assert_eq!(parse_site_date("2025-02-05"), None);
        assert_eq!(parse_site_date(""), None);
    }

    #[test]
    fn test_discovered_defaults() {
        let entry = CrawlUrl::discovered("https://example.vn/doc-99.aspx", "Doc", None);
        assert_eq!(entry.status, UrlStatus::Pending);
        assert_eq!(entry.priority, 0);
        assert_eq!(entry.retry_count, 0);
        assert_eq!(entry.doc_id, Some("99".to_string()));
        assert!(entry.last_crawled_at.is_none());
    }
}
