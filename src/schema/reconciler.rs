//! Incremental schema reconciliation across pages

use super::types::{ColumnType, Schema};
use crate::error::{Error, Result};
use crate::output::Row;
use crate::record::{FieldValue, Record};
use crate::types::JsonObject;
use std::sync::Arc;

/// Default separator for flattened column names
pub const DEFAULT_SEPARATOR: &str = ".";

/// Merges per-record field observations into one column schema.
///
/// Columns are appended in first-seen order and only ever widen. A column is
/// nullable once any record carried null for it, lacked it, or predates its
/// first appearance.
#[derive(Debug, Clone)]
pub struct SchemaReconciler {
    schema: Schema,
    records_observed: u64,
    flatten_nested: bool,
    separator: String,
}

impl Default for SchemaReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaReconciler {
    /// Create a reconciler that keeps nested values opaque
    pub fn new() -> Self {
        Self {
            schema: Schema::new(),
            records_observed: 0,
            flatten_nested: false,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    /// Flatten nested objects into path-qualified columns
    #[must_use]
    pub fn with_flattening(mut self, separator: impl Into<String>) -> Self {
        self.flatten_nested = true;
        self.separator = separator.into();
        self
    }

    /// Fold one record into the schema
    pub fn observe(&mut self, record: &Record) {
        let known = self.schema.len();
        let mut seen = vec![false; known];

        for (name, value) in self.leaves(record) {
            match self.schema.position(&name) {
                Some(i) => {
                    self.schema.column_type_mut(i).observe(&value);
                    if i < known {
                        seen[i] = true;
                    }
                }
                None => {
                    let mut column_type = ColumnType::from_value(&value);
                    if self.records_observed > 0 {
                        column_type.make_nullable();
                    }
                    self.schema.push(name, column_type);
                }
            }
        }

        for (i, present) in seen.into_iter().enumerate() {
            if !present {
                self.schema.column_type_mut(i).make_nullable();
            }
        }

        self.records_observed += 1;
    }

    /// Fold a batch of records into the schema, in order
    pub fn observe_all<'a>(&mut self, records: impl IntoIterator<Item = &'a Record>) {
        for record in records {
            self.observe(record);
        }
    }

    /// The schema as observed so far
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Freeze the current schema for projection
    pub fn finalize(&self) -> Schema {
        self.schema.clone()
    }

    /// Number of records observed
    pub fn records_observed(&self) -> u64 {
        self.records_observed
    }

    /// Forget everything observed
    pub fn reset(&mut self) {
        self.schema = Schema::new();
        self.records_observed = 0;
    }

    /// Project a record onto `schema`, filling absent columns with null and
    /// coercing values to their column types.
    ///
    /// A field the schema does not know is a [`Error::SchemaConflict`]; that
    /// only happens when `schema` was finalized before `record` was observed.
    pub fn project(&self, record: &Record, schema: &Arc<Schema>) -> Result<Row> {
        let mut values = vec![FieldValue::Null; schema.len()];

        for (name, value) in self.leaves(record) {
            let Some(position) = schema.position(&name) else {
                return Err(Error::schema_conflict(name, "field missing from schema"));
            };
            let column_type = schema.columns()[position].column_type;
            values[position] = column_type.coerce(&name, value)?;
        }

        for (column, value) in schema.columns().iter().zip(values.iter()) {
            if value.is_null() && !column.column_type.nullable {
                return Err(Error::schema_conflict(
                    &column.name,
                    "absent from record but not nullable",
                ));
            }
        }

        Ok(Row::new(Arc::clone(schema), values))
    }

    /// Project a batch of records onto `schema`
    pub fn project_all<'a>(
        &self,
        records: impl IntoIterator<Item = &'a Record>,
        schema: &Arc<Schema>,
    ) -> Result<Vec<Row>> {
        records
            .into_iter()
            .map(|record| self.project(record, schema))
            .collect()
    }

    /// Leaf `(column, value)` pairs of a record under the flattening mode
    fn leaves(&self, record: &Record) -> Vec<(String, FieldValue)> {
        let mut out = Vec::with_capacity(record.len());
        for (name, value) in record.iter() {
            match value {
                FieldValue::Object(map) if self.flatten_nested => {
                    self.flatten_into(name, map, &mut out);
                }
                other => out.push((name.to_string(), other.clone())),
            }
        }
        out
    }

    fn flatten_into(
        &self,
        prefix: &str,
        map: &JsonObject,
        out: &mut Vec<(String, FieldValue)>,
    ) {
        if map.is_empty() {
            out.push((prefix.to_string(), FieldValue::Null));
            return;
        }
        for (key, value) in map {
            let path = format!("{prefix}{}{key}", self.separator);
            match FieldValue::from_json(value) {
                FieldValue::Object(nested) => self.flatten_into(&path, &nested, out),
                leaf => out.push((path, leaf)),
            }
        }
    }
}
