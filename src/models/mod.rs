//! Data models for lexacquire.

mod crawl;
mod document;
mod relationship;
mod session;
mod term;

pub use crawl::{extract_doc_id, parse_site_date, CrawlUrl, UrlStatus};
pub use document::{compute_diff, DocumentVersion, VersionDiff};
pub use relationship::{normalize_relation_type, Relationship};
pub use session::{CrawlSession, ItemOutcome, SessionStatus};
pub use term::Term;
