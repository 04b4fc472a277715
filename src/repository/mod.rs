//! Repository layer for SQLite persistence.
//!
//! All mutations to shared state go through the repository contracts here,
//! never through ad-hoc writes, so the invariants on version chains,
//! relationship uniqueness, and session lifecycles hold everywhere.

pub mod crawl;
pub mod document;
pub mod relationship;
pub mod session;
pub mod term;

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use thiserror::Error;

pub use crawl::{CrawlRepository, HarvestStats, LinkOutcome, QueueSnapshot};
pub use document::{DocumentRepository, UpsertOutcome};
pub use relationship::RelationshipRepository;
pub use session::SessionRepository;
pub use term::{DuplicateGroup, TermRepository};

/// Errors surfaced by the repository layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying storage failure. Transient conditions (locked or busy
    /// database) surface here unchanged; retry policy belongs to the caller.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Payload serialization failure, raised before any write.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input rejected before any write.
    #[error("validation error: {0}")]
    Validation(String),

    /// Session lifecycle misuse, e.g. closing an already-terminal session.
    #[error("session state error: {0}")]
    SessionState(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Open a connection with the pragmas shared by all repositories.
pub(crate) fn connect(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

/// All repositories over one database file.
///
/// Construction initializes every schema in dependency order, so foreign
/// keys across repositories always have their target tables in place.
#[derive(Clone)]
pub struct DbContext {
    crawl: CrawlRepository,
    documents: DocumentRepository,
    relationships: RelationshipRepository,
    sessions: SessionRepository,
    terms: TermRepository,
}

impl DbContext {
    /// Open (and initialize if needed) all repositories on a database file.
    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self {
            crawl: CrawlRepository::new(db_path)?,
            documents: DocumentRepository::new(db_path)?,
            relationships: RelationshipRepository::new(db_path)?,
            sessions: SessionRepository::new(db_path)?,
            terms: TermRepository::new(db_path)?,
        })
    }

    pub fn crawl(&self) -> &CrawlRepository {
        &self.crawl
    }

    pub fn documents(&self) -> &DocumentRepository {
        &self.documents
    }

    pub fn relationships(&self) -> &RelationshipRepository {
        &self.relationships
    }

    pub fn sessions(&self) -> &SessionRepository {
        &self.sessions
    }

    pub fn terms(&self) -> &TermRepository {
        &self.terms
    }
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

/// Parse an optional ISO date string from the database.
pub fn parse_date_opt(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}
