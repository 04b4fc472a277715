//! Command-line interface for lexa.

mod commands;
mod helpers;

pub use commands::{is_verbose, run};
