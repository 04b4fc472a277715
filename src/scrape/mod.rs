//! Page fetching and HTML extraction.

mod fetch;
mod parse;

pub use fetch::{FetchError, FetchedPage, HttpFetcher, PageFetcher};
pub use parse::{
    parse_document_fields, parse_glossary, parse_listing, parse_relations, ExtractedRelation,
    GlossaryEntry, HarvestedLink,
};
