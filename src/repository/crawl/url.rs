//! Link upsert policy and URL queries.
//!
//! Harvested links run through a two-tier policy: completed URLs are
//! re-queued only when the site-reported update date strictly advances,
//! while pending or failed URLs are always refreshed. The date gate is the
//! fast path that avoids re-fetching unchanged documents at scale.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};

use super::helpers::row_to_crawl_url;
use super::{CrawlRepository, Result};
use crate::models::{extract_doc_id, CrawlUrl, UrlStatus};
use crate::repository::RepositoryError;

/// Outcome of running one harvested link through the re-queue policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// First sighting; queued for crawling.
    Inserted,
    /// Known URL refreshed and re-queued.
    Refreshed,
    /// Known URL left untouched; nothing was written.
    Skipped,
}

/// Aggregate counts for a harvest batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarvestStats {
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
}

impl HarvestStats {
    pub fn record(&mut self, outcome: LinkOutcome) {
        match outcome {
            LinkOutcome::Inserted => self.inserted += 1,
            LinkOutcome::Refreshed => self.updated += 1,
            LinkOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.inserted + self.updated + self.skipped
    }
}

impl CrawlRepository {
    /// Run one harvested link through the re-queue policy.
    ///
    /// - Unknown URL: insert as pending with priority 0.
    /// - Completed URL: re-queue (refresh title/date, reset to pending,
    ///   bump priority) only when the reported date strictly advances;
    ///   otherwise skip without writing. A missing date also skips.
    /// - Pending/crawled/failed URL: always refresh and reset to pending.
    pub fn upsert_link(
        &self,
        url: &str,
        title: &str,
        reported_date: Option<NaiveDate>,
    ) -> Result<LinkOutcome> {
        if url.trim().is_empty() {
            return Err(RepositoryError::Validation("empty URL".to_string()));
        }

        let conn = self.connect()?;
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: Result<LinkOutcome> = (|| {
            let existing = conn
                .query_row(
                    "SELECT status, last_update_date FROM crawl_urls WHERE url = ?",
                    params![url],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Option<String>>(1)?,
                        ))
                    },
                )
                .optional()?;

            let Some((status, stored_date)) = existing else {
                let entry = CrawlUrl::discovered(url, title, reported_date);
                conn.execute(
                    r#"
                    INSERT INTO crawl_urls (url, doc_id, title, last_update_date, status, priority, discovered_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    params![
                        entry.url,
                        entry.doc_id,
                        entry.title,
                        entry.last_update_date.map(|d| d.to_string()),
                        entry.status.as_str(),
                        entry.priority,
                        entry.discovered_at.to_rfc3339(),
                    ],
                )?;
                return Ok(LinkOutcome::Inserted);
            };

            if status == UrlStatus::Completed.as_str() {
                let stored_date = stored_date
                    .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok());
                let advanced = matches!(
                    (reported_date, stored_date),
                    (Some(new), Some(old)) if new > old
                );
                if !advanced {
                    return Ok(LinkOutcome::Skipped);
                }

                conn.execute(
                    r#"
                    UPDATE crawl_urls SET
                        title = ?1,
                        last_update_date = ?2,
                        status = 'pending',
                        priority = priority + 1
                    WHERE url = ?3
                    "#,
                    params![title, reported_date.map(|d| d.to_string()), url],
                )?;
                return Ok(LinkOutcome::Refreshed);
            }

            // Stale in-progress or failed entries are always re-queued.
            conn.execute(
                r#"
                UPDATE crawl_urls SET
                    title = ?1,
                    last_update_date = ?2,
                    status = 'pending'
                WHERE url = ?3
                "#,
                params![title, reported_date.map(|d| d.to_string()), url],
            )?;
            Ok(LinkOutcome::Refreshed)
        })();

        if result.is_ok() {
            conn.execute("COMMIT", [])?;
        } else {
            let _ = conn.execute("ROLLBACK", []);
        }

        result
    }

    /// Get a specific URL's crawl state.
    pub fn get_url(&self, url: &str) -> Result<Option<CrawlUrl>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM crawl_urls WHERE url = ?")?;
        Ok(stmt.query_row(params![url], row_to_crawl_url).optional()?)
    }

    /// Resolve a URL's row ID, creating a minimal pending entry if unknown.
    ///
    /// Used by the document store when a document arrives for a URL that
    /// was never harvested. Runs inside the caller's connection so version
    /// assignment and URL creation share one transaction.
    pub(crate) fn get_or_create_url_id(
        conn: &rusqlite::Connection,
        url: &str,
    ) -> rusqlite::Result<i64> {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM crawl_urls WHERE url = ?",
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            r#"
            INSERT INTO crawl_urls (url, doc_id, title, status, discovered_at)
            VALUES (?1, ?2, '', 'pending', ?3)
            "#,
            params![url, extract_doc_id(url), Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo() -> (TempDir, CrawlRepository) {
        let dir = TempDir::new().unwrap();
        let repo = CrawlRepository::new(&dir.path().join("lexacquire.db")).unwrap();
        (dir, repo)
    }

    fn date(s: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    }

    #[test]
    fn test_upsert_link_rejects_empty_url() {
        let (_dir, repo) = repo();
        assert!(matches!(
            repo.upsert_link("", "title", None),
            Err(RepositoryError::Validation(_))
        ));
    }

    #[test]
    fn test_new_link_inserted_pending() {
        let (_dir, repo) = repo();
        let outcome = repo
            .upsert_link("https://example.vn/doc-1.aspx", "Doc 1", date("2025-01-01"))
            .unwrap();
        assert_eq!(outcome, LinkOutcome::Inserted);

        let entry = repo.get_url("https://example.vn/doc-1.aspx").unwrap().unwrap();
        assert_eq!(entry.status, UrlStatus::Pending);
        assert_eq!(entry.priority, 0);
        assert_eq!(entry.doc_id, Some("1".to_string()));
        assert_eq!(entry.last_update_date, date("2025-01-01"));
    }

    #[test]
    fn test_completed_link_same_date_skipped() {
        let (_dir, repo) = repo();
        let url = "https://example.vn/doc-1.aspx";
        repo.upsert_link(url, "Doc 1", date("2025-01-01")).unwrap();
        let id = repo.get_url(url).unwrap().unwrap().id;
        repo.mark_completed(id).unwrap();

        let outcome = repo.upsert_link(url, "Doc 1", date("2025-01-01")).unwrap();
        assert_eq!(outcome, LinkOutcome::Skipped);
        let entry = repo.get_url(url).unwrap().unwrap();
        assert_eq!(entry.status, UrlStatus::Completed);
        assert_eq!(entry.priority, 0);
    }

    #[test]
    fn test_completed_link_advanced_date_requeued() {
        let (_dir, repo) = repo();
        let url = "https://example.vn/doc-1.aspx";
        repo.upsert_link(url, "Doc 1", date("2025-01-01")).unwrap();
        let id = repo.get_url(url).unwrap().unwrap().id;
        repo.mark_completed(id).unwrap();

        let outcome = repo
            .upsert_link(url, "Doc 1 (rev)", date("2025-02-01"))
            .unwrap();
        assert_eq!(outcome, LinkOutcome::Refreshed);

        let entry = repo.get_url(url).unwrap().unwrap();
        assert_eq!(entry.status, UrlStatus::Pending);
        assert_eq!(entry.priority, 1);
        assert_eq!(entry.title, "Doc 1 (rev)");
        assert_eq!(entry.last_update_date, date("2025-02-01"));
    }

    #[test]
    fn test_completed_link_missing_date_skipped() {
        let (_dir, repo) = repo();
        let url = "https://example.vn/doc-1.aspx";
        repo.upsert_link(url, "Doc 1", date("2025-01-01")).unwrap();
        let id = repo.get_url(url).unwrap().unwrap().id;
        repo.mark_completed(id).unwrap();

        assert_eq!(
            repo.upsert_link(url, "Doc 1", None).unwrap(),
            LinkOutcome::Skipped
        );
    }

    #[test]
    fn test_failed_link_always_requeued() {
        let (_dir, repo) = repo();
        let url = "https://example.vn/doc-1.aspx";
        repo.upsert_link(url, "Doc 1", date("2025-01-01")).unwrap();
        let id = repo.get_url(url).unwrap().unwrap().id;
        repo.mark_failed(id, "timeout").unwrap();

        // Same date, but a failed entry is still eligible for re-crawl.
        let outcome = repo.upsert_link(url, "Doc 1", date("2025-01-01")).unwrap();
        assert_eq!(outcome, LinkOutcome::Refreshed);
        let entry = repo.get_url(url).unwrap().unwrap();
        assert_eq!(entry.status, UrlStatus::Pending);
    }

    #[test]
    fn test_harvest_stats_totals() {
        let mut stats = HarvestStats::default();
        stats.record(LinkOutcome::Inserted);
        stats.record(LinkOutcome::Refreshed);
        stats.record(LinkOutcome::Skipped);
        stats.record(LinkOutcome::Skipped);
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.total(), 4);
    }
}
