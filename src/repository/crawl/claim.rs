//! Claiming and status transitions for queued URLs.

use chrono::Utc;
use rusqlite::params;

use super::helpers::row_to_crawl_url;
use super::{CrawlRepository, Result};
use crate::models::{CrawlUrl, UrlStatus};
use crate::repository::RepositoryError;

impl CrawlRepository {
    /// Atomically claim pending URLs for processing.
    ///
    /// Claimed rows move to `crawled` inside one immediate transaction so
    /// concurrent workers never receive the same URL. Highest priority
    /// first, then oldest discovery.
    pub fn claim_pending(&self, limit: u32) -> Result<Vec<CrawlUrl>> {
        let conn = self.connect()?;
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: Result<Vec<CrawlUrl>> = (|| {
            let mut stmt = conn.prepare(
                r#"
                SELECT * FROM crawl_urls
                WHERE status = 'pending'
                ORDER BY priority DESC, discovered_at ASC
                LIMIT ?
            "#,
            )?;
            let urls: Vec<CrawlUrl> = stmt
                .query_map(params![limit], row_to_crawl_url)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            for url in &urls {
                conn.execute(
                    "UPDATE crawl_urls SET status = 'crawled' WHERE id = ?",
                    params![url.id],
                )?;
            }

            Ok(urls
                .into_iter()
                .map(|mut u| {
                    u.status = UrlStatus::Crawled;
                    u
                })
                .collect())
        })();

        if result.is_ok() {
            conn.execute("COMMIT", [])?;
        } else {
            let _ = conn.execute("ROLLBACK", []);
        }

        result
    }

    /// Mark a claimed URL as completed.
    pub fn mark_completed(&self, id: i64) -> Result<()> {
        let conn = self.connect()?;
        let rows = conn.execute(
            r#"
            UPDATE crawl_urls SET
                status = 'completed',
                retry_count = 0,
                last_error = NULL,
                last_crawled_at = ?1
            WHERE id = ?2
            "#,
            params![Utc::now().to_rfc3339(), id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::Validation(format!(
                "no crawl URL with id {id}"
            )));
        }
        Ok(())
    }

    /// Mark a claimed URL as failed, recording the error.
    pub fn mark_failed(&self, id: i64, error: &str) -> Result<()> {
        let conn = self.connect()?;
        let rows = conn.execute(
            r#"
            UPDATE crawl_urls SET
                status = 'failed',
                retry_count = retry_count + 1,
                last_error = ?1,
                last_crawled_at = ?2
            WHERE id = ?3
            "#,
            params![error, Utc::now().to_rfc3339(), id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::Validation(format!(
                "no crawl URL with id {id}"
            )));
        }
        Ok(())
    }

    /// Re-queue failed URLs that still have retry budget.
    ///
    /// Returns how many URLs moved back to pending.
    pub fn requeue_retryable(&self, max_retries: u32) -> Result<u64> {
        let conn = self.connect()?;
        let rows = conn.execute(
            "UPDATE crawl_urls SET status = 'pending' WHERE status = 'failed' AND retry_count < ?",
            params![max_retries],
        )?;
        Ok(rows as u64)
    }

    /// Release claimed-but-unprocessed URLs back to pending.
    ///
    /// Used when a run is interrupted after claiming.
    pub fn release_claimed(&self) -> Result<u64> {
        let conn = self.connect()?;
        let rows = conn.execute(
            "UPDATE crawl_urls SET status = 'pending' WHERE status = 'crawled'",
            [],
        )?;
        Ok(rows as u64)
    }
}
