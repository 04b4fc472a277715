//! Crawl session lifecycle and counters.
//!
//! Sessions move RUNNING -> COMPLETED/FAILED exactly once. The guarded
//! UPDATE statements make the terminal transition race-safe: whichever
//! caller closes the session first wins, and the loser gets a session
//! state error instead of silently double-closing.

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{parse_datetime, parse_datetime_opt, RepositoryError, Result};
use crate::models::{CrawlSession, ItemOutcome, SessionStatus};

/// Note recorded on sessions closed by the stale sweep.
const STALE_SWEEP_NOTE: &str = "interrupted; closed by cleanup";

/// SQLite-backed repository for crawl sessions.
#[derive(Clone)]
pub struct SessionRepository {
    db_path: PathBuf,
}

impl SessionRepository {
    /// Create a new session repository.
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
            -- One row per crawl run
            CREATE TABLE IF NOT EXISTS crawl_sessions (
                session_id INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                status TEXT NOT NULL DEFAULT 'RUNNING',
                total_items INTEGER NOT NULL DEFAULT 0,
                new_items INTEGER NOT NULL DEFAULT 0,
                updated_items INTEGER NOT NULL DEFAULT 0,
                unchanged_items INTEGER NOT NULL DEFAULT 0,
                failed_items INTEGER NOT NULL DEFAULT 0,
                notes TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_crawl_sessions_status
                ON crawl_sessions(status);
        "#,
        )?;
        Ok(())
    }

    /// Start a new RUNNING session with zero counters.
    pub fn start(&self) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO crawl_sessions (started_at, status) VALUES (?1, 'RUNNING')",
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Record one processed item's outcome against a running session.
    pub fn record_outcome(&self, session_id: i64, outcome: ItemOutcome) -> Result<()> {
        let column = match outcome {
            ItemOutcome::New => "new_items",
            ItemOutcome::Updated => "updated_items",
            ItemOutcome::Unchanged => "unchanged_items",
            ItemOutcome::Failed => "failed_items",
        };

        let conn = self.connect()?;
        let rows = conn.execute(
            &format!(
                "UPDATE crawl_sessions SET {column} = {column} + 1, total_items = total_items + 1 \
                 WHERE session_id = ?1 AND status = 'RUNNING'"
            ),
            params![session_id],
        )?;
        if rows == 0 {
            return Err(self.not_running_error(&conn, session_id));
        }
        Ok(())
    }

    /// Close a session successfully. Errors if the session is already terminal.
    pub fn complete(&self, session_id: i64, notes: Option<&str>) -> Result<()> {
        self.close(session_id, SessionStatus::Completed, notes)
    }

    /// Close a session as failed, recording the reason.
    pub fn fail(&self, session_id: i64, reason: &str) -> Result<()> {
        self.close(session_id, SessionStatus::Failed, Some(reason))
    }

    fn close(&self, session_id: i64, status: SessionStatus, notes: Option<&str>) -> Result<()> {
        let conn = self.connect()?;
        let rows = conn.execute(
            r#"
            UPDATE crawl_sessions
            SET status = ?1, completed_at = ?2, notes = COALESCE(?3, notes)
            WHERE session_id = ?4 AND status = 'RUNNING'
            "#,
            params![
                status.as_str(),
                Utc::now().to_rfc3339(),
                notes,
                session_id
            ],
        )?;
        if rows == 0 {
            return Err(self.not_running_error(&conn, session_id));
        }
        Ok(())
    }

    /// Get a session by ID.
    pub fn get(&self, session_id: i64) -> Result<Option<CrawlSession>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM crawl_sessions WHERE session_id = ?")?;
        Ok(stmt
            .query_row(params![session_id], row_to_session)
            .optional()?)
    }

    /// Get the most recent sessions, newest first.
    pub fn recent(&self, limit: u32) -> Result<Vec<CrawlSession>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT * FROM crawl_sessions ORDER BY session_id DESC LIMIT ?")?;
        let sessions = stmt
            .query_map(params![limit], row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Get all sessions still marked RUNNING.
    pub fn running(&self) -> Result<Vec<CrawlSession>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM crawl_sessions WHERE status = 'RUNNING' ORDER BY session_id ASC",
        )?;
        let sessions = stmt
            .query_map([], row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Force-fail sessions RUNNING longer than the threshold.
    ///
    /// Interrupted processes leave their sessions RUNNING forever; this
    /// sweep is the external cleanup for them. Returns how many sessions
    /// were closed.
    pub fn fail_stale(&self, threshold_secs: i64) -> Result<u64> {
        let cutoff = (Utc::now() - Duration::seconds(threshold_secs)).to_rfc3339();
        let conn = self.connect()?;
        let rows = conn.execute(
            r#"
            UPDATE crawl_sessions
            SET status = 'FAILED', completed_at = ?1, notes = ?2
            WHERE status = 'RUNNING' AND started_at < ?3
            "#,
            params![Utc::now().to_rfc3339(), STALE_SWEEP_NOTE, cutoff],
        )?;
        Ok(rows as u64)
    }

    fn not_running_error(&self, conn: &Connection, session_id: i64) -> RepositoryError {
        let exists = conn
            .query_row(
                "SELECT status FROM crawl_sessions WHERE session_id = ?",
                params![session_id],
                |row| row.get::<_, String>(0),
            )
            .optional();
        match exists {
            Ok(Some(status)) => RepositoryError::SessionState(format!(
                "session {session_id} is already {status}"
            )),
            Ok(None) => RepositoryError::SessionState(format!(
                "session {session_id} does not exist"
            )),
            Err(e) => RepositoryError::Storage(e),
        }
    }
}

fn row_to_session(row: &Row) -> rusqlite::Result<CrawlSession> {
    Ok(CrawlSession {
        session_id: row.get("session_id")?,
        started_at: parse_datetime(&row.get::<_, String>("started_at")?),
        completed_at: parse_datetime_opt(row.get("completed_at")?),
        status: SessionStatus::from_str(&row.get::<_, String>("status")?)
            .unwrap_or(SessionStatus::Failed),
        total_items: row.get::<_, i64>("total_items")? as u64,
        new_items: row.get::<_, i64>("new_items")? as u64,
        updated_items: row.get::<_, i64>("updated_items")? as u64,
        unchanged_items: row.get::<_, i64>("unchanged_items")? as u64,
        failed_items: row.get::<_, i64>("failed_items")? as u64,
        notes: row.get("notes")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo() -> (TempDir, SessionRepository) {
        let dir = TempDir::new().unwrap();
        let repo = SessionRepository::new(&dir.path().join("lexacquire.db")).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_start_creates_running_session() {
        let (_dir, repo) = repo();
        let id = repo.start().unwrap();
        let session = repo.get(id).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Running);
        assert_eq!(session.total_items, 0);
        assert!(session.completed_at.is_none());
    }

    #[test]
    fn test_record_outcome_increments_counters() {
        let (_dir, repo) = repo();
        let id = repo.start().unwrap();

        repo.record_outcome(id, ItemOutcome::New).unwrap();
        repo.record_outcome(id, ItemOutcome::New).unwrap();
        repo.record_outcome(id, ItemOutcome::Updated).unwrap();
        repo.record_outcome(id, ItemOutcome::Unchanged).unwrap();
        repo.record_outcome(id, ItemOutcome::Failed).unwrap();

        let session = repo.get(id).unwrap().unwrap();
        assert_eq!(session.new_items, 2);
        assert_eq!(session.updated_items, 1);
        assert_eq!(session.unchanged_items, 1);
        assert_eq!(session.failed_items, 1);
        assert_eq!(session.total_items, 5);
        assert!(session.counters_consistent());
    }

    #[test]
    fn test_complete_sets_terminal_state() {
        let (_dir, repo) = repo();
        let id = repo.start().unwrap();
        repo.complete(id, Some("3 pages")).unwrap();

        let session = repo.get(id).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(session.completed_at.is_some());
        assert_eq!(session.notes.as_deref(), Some("3 pages"));
    }

    #[test]
    fn test_complete_twice_is_state_error() {
        let (_dir, repo) = repo();
        let id = repo.start().unwrap();
        repo.complete(id, None).unwrap();

        assert!(matches!(
            repo.complete(id, None),
            Err(RepositoryError::SessionState(_))
        ));
        assert!(matches!(
            repo.fail(id, "late failure"),
            Err(RepositoryError::SessionState(_))
        ));
    }

    #[test]
    fn test_record_outcome_after_close_is_state_error() {
        let (_dir, repo) = repo();
        let id = repo.start().unwrap();
        repo.fail(id, "browser crashed").unwrap();

        assert!(matches!(
            repo.record_outcome(id, ItemOutcome::New),
            Err(RepositoryError::SessionState(_))
        ));
    }

    #[test]
    fn test_record_outcome_unknown_session() {
        let (_dir, repo) = repo();
        assert!(matches!(
            repo.record_outcome(42, ItemOutcome::New),
            Err(RepositoryError::SessionState(_))
        ));
    }

    #[test]
    fn test_fail_records_reason() {
        let (_dir, repo) = repo();
        let id = repo.start().unwrap();
        repo.fail(id, "browser crashed").unwrap();

        let session = repo.get(id).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.notes.as_deref(), Some("browser crashed"));
    }

    #[test]
    fn test_fail_stale_only_touches_old_running() {
        let (_dir, repo) = repo();
        let stale = repo.start().unwrap();
        let fresh = repo.start().unwrap();
        let done = repo.start().unwrap();
        repo.complete(done, None).unwrap();

        // Backdate the stale session.
        {
            let conn = repo.connect().unwrap();
            let old = (Utc::now() - Duration::hours(5)).to_rfc3339();
            conn.execute(
                "UPDATE crawl_sessions SET started_at = ?1 WHERE session_id = ?2",
                params![old, stale],
            )
            .unwrap();
        }

        assert_eq!(repo.fail_stale(3600).unwrap(), 1);

        let stale_session = repo.get(stale).unwrap().unwrap();
        assert_eq!(stale_session.status, SessionStatus::Failed);
        assert_eq!(stale_session.notes.as_deref(), Some(STALE_SWEEP_NOTE));

        assert_eq!(
            repo.get(fresh).unwrap().unwrap().status,
            SessionStatus::Running
        );
        assert_eq!(
            repo.get(done).unwrap().unwrap().status,
            SessionStatus::Completed
        );
    }

    #[test]
    fn test_running_and_recent_listings() {
        let (_dir, repo) = repo();
        let a = repo.start().unwrap();
        let b = repo.start().unwrap();
        repo.complete(a, None).unwrap();

        let running = repo.running().unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].session_id, b);

        let recent = repo.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].session_id, b);
    }
}
