//! Versioned document metadata models.
//!
//! A document's extracted metadata is stored as an append-only chain of
//! versions keyed by its crawl URL. A new version exists only where the
//! content fingerprint changed, so the chain is a complete change history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One immutable snapshot of a document's extracted metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersion {
    /// Database row ID.
    pub id: i64,
    /// Owning crawl URL row.
    pub doc_url_id: i64,
    /// Position in the version chain, starting at 1.
    pub version: i64,
    /// Fingerprint of `extra_data` at capture time.
    pub content_hash: String,
    /// The extracted metadata fields.
    pub extra_data: Map<String, Value>,
    /// Field-level changes against the previous version, absent on the first.
    pub diff_summary: Option<VersionDiff>,
    /// Session that produced this version, when known.
    pub session_id: Option<i64>,
    /// When this version was captured.
    pub created_at: DateTime<Utc>,
}

/// Field-level difference between two consecutive versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDiff {
    /// Fields present in both versions with differing values.
    pub changed: Vec<String>,
    /// Fields present only in the newer version.
    pub added: Vec<String>,
    /// Fields present only in the older version.
    pub removed: Vec<String>,
}

impl VersionDiff {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compute the field-level diff between two metadata snapshots.
///
/// Returns `None` when nothing differs. Field names are sorted so the
/// stored summary is stable across runs.
pub fn compute_diff(old: &Map<String, Value>, new: &Map<String, Value>) -> Option<VersionDiff> {
    let mut diff = VersionDiff::default();

    for (key, new_value) in new {
        match old.get(key) {
            Some(old_value) if old_value != new_value => diff.changed.push(key.clone()),
            Some(_) => {}
            None => diff.added.push(key.clone()),
        }
    }
    for key in old.keys() {
        if !new.contains_key(key) {
            diff.removed.push(key.clone());
        }
    }

    diff.changed.sort();
    diff.added.sort();
    diff.removed.sort();

    if diff.is_empty() {
        None
    } else {
        Some(diff)
    }
}
