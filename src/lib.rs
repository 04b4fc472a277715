//! lexacquire - legal document acquisition and change tracking system.
//!
//! Core library exposing the crawl state machine: content fingerprinting,
//! versioned document persistence, relationship backfill, session
//! tracking, and the glossary catalog.

// Model types use `from_str` methods that return Self (infallible parse),
// not Result<Self, Error> as std::str::FromStr requires.
#![allow(clippy::should_implement_trait)]

pub mod cli;
pub mod config;
pub mod fingerprint;
pub mod models;
pub mod repository;
pub mod scrape;
pub mod services;
