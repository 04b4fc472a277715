//! Directed relationships between documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A directed edge from a document version to another document.
///
/// The target is referenced by URL at insert time; `target_doc_id` stays
/// empty until the target document has been crawled, at which point the
/// backfill pass fills it in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Database row ID.
    pub id: i64,
    /// Source document version.
    pub source_doc_id: i64,
    /// URL of the referenced document.
    pub target_doc_url: String,
    /// Current version of the referenced document, once resolvable.
    pub target_doc_id: Option<i64>,
    /// Normalized relation kind, e.g. `amended_by`, `replaces`.
    pub relationship_type: String,
    /// Link text of the reference, if the page carried one.
    pub target_title: Option<String>,
    /// When the edge was first recorded.
    pub created_at: DateTime<Utc>,
    /// When the target reference was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Normalize a relation heading into a stable type key.
///
/// Lowercases and joins whitespace runs with underscores, so the section
/// headings "Amended by" and "amended  by" map to the same edge type.
pub fn normalize_relation_type(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_relation_type() {
        assert_eq!(normalize_relation_type("Amended by"), "amended_by");
        assert_eq!(normalize_relation_type("  Replaces "), "replaces");
        assert_eq!(normalize_relation_type("Guided   By"), "guided_by");
        assert_eq!(normalize_relation_type(""), "");
    }
}
