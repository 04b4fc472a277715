//! Aggregate queue statistics.

use std::collections::HashMap;

use super::{CrawlRepository, Result};

/// Counts of queued URLs by status.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueSnapshot {
    pub pending: u64,
    pub crawled: u64,
    pub completed: u64,
    pub failed: u64,
}

impl QueueSnapshot {
    pub fn total(&self) -> u64 {
        self.pending + self.crawled + self.completed + self.failed
    }
}

impl CrawlRepository {
    /// Get queue counts grouped by status.
    pub fn queue_snapshot(&self) -> Result<QueueSnapshot> {
        let conn = self.connect()?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM crawl_urls GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;
        for row in rows {
            let (status, count) = row?;
            counts.insert(status, count);
        }

        Ok(QueueSnapshot {
            pending: counts.get("pending").copied().unwrap_or(0),
            crawled: counts.get("crawled").copied().unwrap_or(0),
            completed: counts.get("completed").copied().unwrap_or(0),
            failed: counts.get("failed").copied().unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_queue_snapshot_counts() {
        let dir = TempDir::new().unwrap();
        let repo = CrawlRepository::new(&dir.path().join("lexacquire.db")).unwrap();

        for i in 1..=3 {
            repo.upsert_link(&format!("https://example.vn/doc-{i}.aspx"), "doc", None)
                .unwrap();
        }
        let id = repo
            .get_url("https://example.vn/doc-1.aspx")
            .unwrap()
            .unwrap()
            .id;
        repo.mark_completed(id).unwrap();

        let snapshot = repo.queue_snapshot().unwrap();
        assert_eq!(snapshot.pending, 2);
        assert_eq!(snapshot.completed, 1);
        assert_eq!(snapshot.failed, 0);
        assert_eq!(snapshot.total(), 3);
    }
}
