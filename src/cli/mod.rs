//! CLI module
//!
//! Command-line interface for running ingestions.
//!
//! # Commands
//!
//! - `run` - Ingest an endpoint and print rows as JSON lines
//! - `schema` - Ingest an endpoint and print the reconciled schema
//! - `validate` - Check a config file

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
