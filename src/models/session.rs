//! Crawl session models.
//!
//! A session brackets one bounded batch of crawl work. Counters answer
//! "how much changed" after the fact without re-querying the dataset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a crawl session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "RUNNING" => Some(Self::Running),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal statuses are final; no session transitions out of them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Per-item processing outcome recorded against a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    /// First version of a never-before-seen document.
    New,
    /// A changed document gained a new version.
    Updated,
    /// Fingerprint matched the stored version; nothing written.
    Unchanged,
    /// The item could not be fetched or persisted.
    Failed,
}

impl ItemOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Failed => "failed",
        }
    }
}

/// One crawl run with aggregate counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSession {
    /// Database row ID.
    pub session_id: i64,
    pub started_at: DateTime<Utc>,
    /// Set exactly once, when the session reaches a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub total_items: u64,
    pub new_items: u64,
    pub updated_items: u64,
    pub unchanged_items: u64,
    pub failed_items: u64,
    /// Free-form completion or failure notes.
    pub notes: Option<String>,
}

impl CrawlSession {
    /// Check that the per-outcome counters add up to the total.
    pub fn counters_consistent(&self) -> bool {
        self.new_items + self.updated_items + self.unchanged_items + self.failed_items
            == self.total_items
    }

    /// Check whether a running session has gone stale.
    pub fn is_stale(&self, threshold_secs: i64) -> bool {
        if self.status != SessionStatus::Running {
            return false;
        }
        (Utc::now() - self.started_at).num_seconds() > threshold_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(status: SessionStatus) -> CrawlSession {
        CrawlSession {
            session_id: 1,
            started_at: Utc::now(),
            completed_at: None,
            status,
            total_items: 0,
            new_items: 0,
            updated_items: 0,
            unchanged_items: 0,
            failed_items: 0,
            notes: None,
        }
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            SessionStatus::Running,
            SessionStatus::Completed,
            SessionStatus::Failed,
        ] {
            assert_eq!(SessionStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_status_from_invalid() {
        assert_eq!(SessionStatus::from_str("running"), None);
        assert_eq!(SessionStatus::from_str(""), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!SessionStatus::Running.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
    }

    #[test]
    fn test_counters_consistent() {
        let mut s = session(SessionStatus::Running);
        assert!(s.counters_consistent());

        s.new_items = 2;
        s.unchanged_items = 3;
        s.total_items = 5;
        assert!(s.counters_consistent());

        s.total_items = 6;
        assert!(!s.counters_consistent());
    }

    #[test]
    fn test_is_stale_only_when_running() {
        let mut s = session(SessionStatus::Running);
        s.started_at = Utc::now() - chrono::Duration::hours(2);
        assert!(s.is_stale(3600));

        s.status = SessionStatus::Completed;
        assert!(!s.is_stale(3600));
    }

    #[test]
    fn test_fresh_session_not_stale() {
        let s = session(SessionStatus::Running);
        assert!(!s.is_stale(3600));
    }
}
