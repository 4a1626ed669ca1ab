//! # rest-ingest
//!
//! Ingest paginated REST endpoints into strongly typed, order-preserving
//! tables.
//!
//! ## Features
//!
//! - **Pagination Strategies**: Cursor, offset, page number and next-URL
//! - **Ordered Concurrency**: Prefetch pages concurrently, emit rows in source order
//! - **Retry and Rate Limiting**: Classified retries with backoff, token bucket limiter
//! - **Schema Reconciliation**: Monotonic type widening across heterogeneous pages
//! - **Arrow Output**: Export ingested tables as Arrow `RecordBatch`es
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rest_ingest::{IngestConfig, IngestionEngine, PaginationConfig};
//!
//! #[tokio::main]
//! async fn main() -> rest_ingest::Result<()> {
//!     let config = IngestConfig::new("https://api.example.com/items")
//!         .with_pagination(PaginationConfig::offset(100))
//!         .with_concurrency(4);
//!
//!     let engine = IngestionEngine::with_reqwest(config)?;
//!     let table = engine.ingest_table().await.map_err(|f| f.error)?;
//!     println!("{} rows, schema: {}", table.num_rows(), table.schema());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        IngestionEngine                          │
//! │        ingest() → RowStream        ingest_table() → Table       │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────┬───────────────┴──┬──────────────┬────────────────┐
//! │  Pagination  │      HTTP        │    Schema    │     Output     │
//! ├──────────────┼──────────────────┼──────────────┼────────────────┤
//! │ Cursor       │ PageFetcher      │ Reconciler   │ Row / Table    │
//! │ Offset       │ RetryPolicy      │ Widening     │ Arrow          │
//! │ Page Number  │ RateLimiter      │ Flattening   │ JSON           │
//! │ Next URL     │ Transport        │              │                │
//! └──────────────┴──────────────────┴──────────────┴────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Dynamic record values
pub mod record;

/// Ingestion configuration
pub mod config;

/// Page fetching with retry and rate limiting
pub mod http;

/// Response decoding
pub mod decode;

/// Pagination strategies and cursor
pub mod pagination;

/// Schema reconciliation
pub mod schema;

/// Rows, tables and Arrow export
pub mod output;

/// Ingestion engine
pub mod engine;

/// Command-line interface
pub mod cli;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::IngestConfig;
pub use engine::{CancelHandle, IngestFailure, IngestStats, IngestionEngine, RowStream};
pub use error::{Error, Result};
pub use output::{Row, Table};
pub use pagination::{PaginationConfig, StopCondition};
pub use record::{FieldValue, Record};
pub use schema::{ColumnType, Schema, SchemaReconciler, TypeKind};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
