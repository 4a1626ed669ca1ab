//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::IngestConfig;
use crate::engine::IngestionEngine;
use crate::error::{Error, Result};
use crate::types::SchemaMode;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::info;

/// Overrides for the `run` command
#[derive(Debug, Clone, Copy, Default)]
struct RunOptions {
    max_rows: Option<u64>,
    max_pages: Option<u64>,
    concurrency: Option<usize>,
    eager: bool,
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run {
                max_rows,
                max_pages,
                concurrency,
                eager,
            } => {
                self.ingest(RunOptions {
                    max_rows: *max_rows,
                    max_pages: *max_pages,
                    concurrency: *concurrency,
                    eager: *eager,
                })
                .await
            }
            Commands::Schema { max_pages } => self.schema(*max_pages).await,
            Commands::Validate => self.validate(),
        }
    }

    /// Load the config file
    fn load_config(&self) -> Result<IngestConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -c flag)"))?;
        IngestConfig::from_file(path)
    }

    /// Ingest and print every row as it is produced
    async fn ingest(&self, options: RunOptions) -> Result<()> {
        let mut config = self.load_config()?;
        if let Some(max_rows) = options.max_rows {
            config = config.with_max_rows(max_rows);
        }
        if let Some(max_pages) = options.max_pages {
            config = config.with_max_pages(max_pages);
        }
        if let Some(concurrency) = options.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if options.eager {
            config = config.with_schema_mode(SchemaMode::Eager);
        }

        let engine = IngestionEngine::with_reqwest(config)?;
        let handle = engine.cancel_handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, cancelling ingestion");
                handle.cancel();
            }
        });

        let mut stream = engine.ingest();
        while let Some(item) = stream.next().await {
            match item {
                Ok(row) => self.output_message(&json!({
                    "type": "RECORD",
                    "record": row.to_json(),
                })),
                Err(error) => {
                    self.output_message(&json!({
                        "type": "SUMMARY",
                        "status": "FAILED",
                        "stats": stream.stats(),
                    }));
                    return Err(error);
                }
            }
        }

        self.output_message(&json!({
            "type": "SUMMARY",
            "status": "SUCCEEDED",
            "stats": stream.stats(),
        }));
        Ok(())
    }

    /// Ingest and print the reconciled schema
    async fn schema(&self, max_pages: Option<u64>) -> Result<()> {
        let mut config = self.load_config()?;
        if let Some(max_pages) = max_pages {
            config = config.with_max_pages(max_pages);
        }

        let engine = IngestionEngine::with_reqwest(config)?;
        let (table, stats) = engine
            .ingest_table_with_stats()
            .await
            .map_err(|failure| failure.error)?;

        self.output_message(&json!({
            "type": "SCHEMA",
            "schema": table.schema().as_ref(),
            "rows": table.num_rows(),
            "pages": stats.pages_fetched,
        }));
        Ok(())
    }

    /// Validate the config file
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Config for '{}' is valid ({} pagination, concurrency {})",
                    config.base_url,
                    config.pagination.strategy_name(),
                    config.concurrency
                )
            }
        }));

        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
