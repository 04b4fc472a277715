//! Glossary term catalog models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One named entry in the legal-term glossary, keyed by its source URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    /// Sequential catalog ID.
    pub term_id: i64,
    /// Term name as shown in the glossary listing.
    pub name: String,
    /// Definition text, truncated at harvest time.
    pub definition: String,
    /// Source URL for this entry. Intended unique; the dedup utilities
    /// exist because historic data violated this.
    pub url: String,
    /// Listing URL the entry was harvested from.
    pub source_crawl: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Term {
    /// Create a new term as harvested from a glossary listing.
    pub fn new(name: &str, definition: &str, url: &str, source_crawl: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            term_id: 0, // Set by database
            name: name.to_string(),
            definition: definition.to_string(),
            url: url.to_string(),
            source_crawl: source_crawl.map(|s| s.to_string()),
            created_at: now,
            updated_at: now,
        }
    }
}
