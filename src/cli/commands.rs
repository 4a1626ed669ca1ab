//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Paginated REST ingestion CLI
#[derive(Parser, Debug)]
#[command(name = "rest-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Ingestion config file (YAML, or JSON with a .json extension)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest the endpoint and print rows, then a summary
    Run {
        /// Stop after this many rows
        #[arg(long)]
        max_rows: Option<u64>,

        /// Stop after this many page requests
        #[arg(long)]
        max_pages: Option<u64>,

        /// Page requests in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Emit rows per page instead of after the last page
        #[arg(long)]
        eager: bool,
    },

    /// Ingest the endpoint and print the reconciled schema
    Schema {
        /// Stop after this many page requests
        #[arg(long)]
        max_pages: Option<u64>,
    },

    /// Validate the config file
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
