//! Crawl drivers.

mod crawler;

pub use crawler::{CrawlEvent, CrawlService};
