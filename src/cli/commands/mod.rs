//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific
//! modules.

mod backfill;
mod crawl;
mod dedup;
mod glossary;
mod harvest;
mod init;
mod sessions;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "lexa")]
#[command(about = "Legal document acquisition and change tracking system")]
#[command(version)]
pub struct Cli {
    /// Data directory (overrides config file)
    #[arg(long, short = 'd', global = true)]
    data_dir: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Harvest listing pages into the crawl queue
    Harvest {
        /// First listing page to fetch
        #[arg(long, default_value = "1")]
        start_page: u32,
        /// Number of listing pages to fetch
        #[arg(short, long, default_value = "10")]
        pages: u32,
    },

    /// Crawl pending documents
    Crawl {
        /// Limit number of documents to process (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: u64,
        /// Number of crawl workers
        #[arg(short, long, default_value = "4")]
        workers: usize,
    },

    /// Crawl the glossary term catalog
    Glossary {
        /// Number of glossary listing pages to fetch
        #[arg(short, long, default_value = "3")]
        pages: u32,
    },

    /// Resolve relationship targets that have since been crawled
    Backfill,

    /// Find duplicate catalog entries (and optionally fix them)
    Dedup {
        /// Delete duplicates, keeping the earliest entry per URL
        #[arg(long)]
        fix: bool,
        /// Renumber term IDs contiguously after fixing
        #[arg(long)]
        compact: bool,
    },

    /// List crawl sessions and clean up stale ones
    Sessions {
        /// Force-fail sessions running beyond the staleness threshold
        #[arg(long)]
        cleanup: bool,
        /// Number of sessions to list
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Show system status
    Status,
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    if !matches!(cli.command, Commands::Init) && !settings.database_exists() {
        println!(
            "{} System not initialized. Run 'lexa init' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    match cli.command {
        Commands::Init => init::cmd_init(&settings),
        Commands::Harvest { start_page, pages } => {
            harvest::cmd_harvest(&settings, start_page, pages).await
        }
        Commands::Crawl { limit, workers } => crawl::cmd_crawl(&settings, limit, workers).await,
        Commands::Glossary { pages } => glossary::cmd_glossary(&settings, pages).await,
        Commands::Backfill => backfill::cmd_backfill(&settings),
        Commands::Dedup { fix, compact } => dedup::cmd_dedup(&settings, fix, compact),
        Commands::Sessions { cleanup, limit } => {
            sessions::cmd_sessions(&settings, cleanup, limit)
        }
        Commands::Status => status::cmd_status(&settings),
    }
}
