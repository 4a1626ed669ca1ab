//! Output module
//!
//! Rows, materialized tables and their Arrow form.
//!
//! # Overview
//!
//! This module provides:
//! - `Row` - a record projected onto a reconciled schema
//! - `Table` - rows sharing one schema, in ingestion order
//! - Conversion of a `Table` to an Arrow `RecordBatch`

mod batch;
mod table;

pub use batch::{arrow_type, to_arrow_schema};
pub use table::{Row, Table};

#[cfg(test)]
mod tests;
