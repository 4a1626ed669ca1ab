//! Ingestion engine module
//!
//! Orchestrates cursor advancement, fetching, retries and schema
//! reconciliation into an ordered stream of rows.
//!
//! # Overview
//!
//! The engine module provides:
//! - `IngestionEngine` - Runs ingestions for one validated config
//! - `RowStream` - Lazy, ordered stream of projected rows
//! - `CancelHandle` - Stops running ingestions from another task
//! - `IngestStats` / `IngestFailure` - Run statistics and partial results
//!
//! Rows come out in page order, then in record order within a page,
//! whatever the configured concurrency.

mod run;
mod stream;
mod types;

pub use stream::RowStream;
pub use types::{CancelHandle, IngestFailure, IngestStats};

use crate::config::IngestConfig;
use crate::decode::PageDecoder;
use crate::error::{Error, Result};
use crate::http::{
    PageFetcher, RateLimiter, ReqwestTransport, RequestTemplate, RetryPolicy, Transport,
};
use crate::output::{Row, Table};
use crate::pagination::PaginationCursor;
use crate::schema::SchemaReconciler;
use futures::StreamExt;
use run::{IngestRun, RunLimits};
use std::sync::Arc;
use tracing::warn;
use types::SharedStats;

/// Ingests one paginated endpoint into rows
#[derive(Debug)]
pub struct IngestionEngine {
    config: IngestConfig,
    template: RequestTemplate,
    fetcher: PageFetcher,
    cancel: CancelHandle,
}

impl IngestionEngine {
    /// Create an engine over a transport. The config is validated here.
    pub fn new(config: IngestConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let template = config.request_template()?;
        let limiter = match &config.rate_limit {
            Some(rate_limit) => RateLimiter::new(rate_limit, config.concurrency),
            None => RateLimiter::unlimited(config.concurrency),
        };
        let fetcher = PageFetcher::new(
            transport,
            Arc::new(limiter),
            RetryPolicy::new(config.retry.clone()),
            PageDecoder::from_path(config.records_path.as_deref()),
            config.pagination.build(),
        );

        Ok(Self {
            config,
            template,
            fetcher,
            cancel: CancelHandle::new(),
        })
    }

    /// Create an engine over the default reqwest transport
    pub fn with_reqwest(config: IngestConfig) -> Result<Self> {
        let transport = ReqwestTransport::new()?;
        Self::new(config, Arc::new(transport))
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Handle that cancels this engine's ingestions
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Start an ingestion. Nothing is requested until the stream is polled.
    pub fn ingest(&self) -> RowStream {
        let config = &self.config;
        let paginator = config.pagination.build();

        let cursor = PaginationCursor::new(paginator)
            .with_max_pages(config.max_pages)
            .with_repeat_window(config.repeat_window);

        let reconciler = if config.flatten_nested {
            SchemaReconciler::new().with_flattening(config.flatten_separator.clone())
        } else {
            SchemaReconciler::new()
        };

        let limits = RunLimits {
            concurrency: config.concurrency,
            max_rows: config.max_rows,
            mode: config.schema_mode,
            timeout: config.ingest_timeout(),
            strategy: config.pagination.strategy_name(),
        };

        let run = IngestRun::new(
            self.fetcher.clone(),
            self.template.clone(),
            cursor,
            reconciler,
            limits,
            self.cancel.subscribe(),
            SharedStats::default(),
        );
        RowStream::new(run)
    }

    /// Ingest everything into a table
    pub async fn ingest_table(&self) -> std::result::Result<Table, IngestFailure> {
        self.ingest_table_with_stats().await.map(|(table, _)| table)
    }

    /// Ingest everything into a table and report the run's statistics.
    ///
    /// On failure the [`IngestFailure`] holds the rows produced so far.
    pub async fn ingest_table_with_stats(
        &self,
    ) -> std::result::Result<(Table, IngestStats), IngestFailure> {
        let mut stream = self.ingest();
        let mut rows = Vec::new();

        while let Some(item) = stream.next().await {
            match item {
                Ok(row) => rows.push(row),
                Err(error) => {
                    return Err(IngestFailure {
                        error,
                        partial: partial_table(rows),
                        stats: stream.stats(),
                    });
                }
            }
        }

        let stats = stream.stats();
        let rows_produced = rows.len() as u64;
        match Table::from_rows(rows) {
            Ok(table) => Ok((table, stats)),
            Err(error) => Err(IngestFailure {
                error: Error::aborted(rows_produced, error),
                partial: Table::empty(),
                stats,
            }),
        }
    }
}

/// Table of the rows produced before a failure; empty if they conflict
fn partial_table(rows: Vec<Row>) -> Table {
    let count = rows.len();
    Table::from_rows(rows).unwrap_or_else(|conflict| {
        warn!(
            rows = count,
            error = %conflict,
            "Partial rows could not be assembled into a table"
        );
        Table::empty()
    })
}
