//! Crawl queue repository: URL discovery state and the re-queue policy.

mod claim;
mod helpers;
mod state;
mod url;

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use super::Result;

pub use state::QueueSnapshot;
pub use url::{HarvestStats, LinkOutcome};

/// SQLite-backed repository for the crawl URL queue.
#[derive(Clone)]
pub struct CrawlRepository {
    db_path: PathBuf,
}

impl CrawlRepository {
    /// Create a new crawl repository.
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    pub(crate) fn connect(&self) -> Result<Connection> {
        super::connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            -- One row per canonical document URL ever seen
            CREATE TABLE IF NOT EXISTS crawl_urls (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                doc_id TEXT,
                title TEXT NOT NULL DEFAULT '',
                last_update_date TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                priority INTEGER NOT NULL DEFAULT 0,

                -- Retry tracking
                retry_count INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,

                -- Timing
                discovered_at TEXT NOT NULL,
                last_crawled_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_crawl_urls_status
                ON crawl_urls(status, priority DESC, discovered_at);
            CREATE INDEX IF NOT EXISTS idx_crawl_urls_doc_id
                ON crawl_urls(doc_id);
        "#,
        )?;
        Ok(())
    }
}
