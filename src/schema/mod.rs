//! Schema reconciliation module
//!
//! Merges heterogeneous JSON records observed across pages into one
//! tabular schema.
//!
//! # Features
//!
//! - **First-seen Ordering**: Columns keep the order they were first observed in
//! - **Monotonic Widening**: integer → float → string, never narrowed
//! - **Nullable Detection**: Nulls and missing fields mark a column nullable
//! - **Optional Flattening**: Nested objects become `parent.child` columns

mod reconciler;
mod types;

pub use reconciler::{SchemaReconciler, DEFAULT_SEPARATOR};
pub use types::{Column, ColumnType, Schema, TypeKind};
