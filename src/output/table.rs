//! Rows and materialized tables

use crate::error::{Error, Result};
use crate::record::FieldValue;
use crate::schema::Schema;
use crate::types::{JsonObject, JsonValue};
use std::sync::Arc;

/// A record projected onto a schema: exactly one value per column
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    schema: Arc<Schema>,
    values: Vec<FieldValue>,
}

impl Row {
    /// Create a row. `values` must line up with `schema`'s columns.
    pub(crate) fn new(schema: Arc<Schema>, values: Vec<FieldValue>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self { schema, values }
    }

    /// The schema this row was projected against
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Values in column order
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Look up a value by column name
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.schema.position(column).map(|i| &self.values[i])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// JSON object with one key per column, in column order
    pub fn to_json(&self) -> JsonValue {
        let mut map = JsonObject::new();
        for (name, value) in self.schema.names().zip(&self.values) {
            map.insert(name.to_string(), value.to_json());
        }
        JsonValue::Object(map)
    }

    /// Re-project onto a wider schema that contains every column of this row
    fn widen_to(&self, target: &Arc<Schema>) -> Result<Row> {
        if Arc::ptr_eq(&self.schema, target) || *self.schema == **target {
            return Ok(Row::new(Arc::clone(target), self.values.clone()));
        }

        let mut values = Vec::with_capacity(target.len());
        for column in target.columns() {
            let value = self.get(&column.name).cloned().unwrap_or(FieldValue::Null);
            values.push(column.column_type.coerce(&column.name, value)?);
        }
        for name in self.schema.names() {
            if target.position(name).is_none() {
                return Err(Error::schema_conflict(name, "column dropped from table schema"));
            }
        }
        Ok(Row::new(Arc::clone(target), values))
    }
}

/// A materialized table: one schema, rows in ingestion order
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Arc<Schema>,
    rows: Vec<Row>,
}

impl Default for Table {
    fn default() -> Self {
        Self::empty()
    }
}

impl Table {
    /// A table with no columns and no rows
    pub fn empty() -> Self {
        Self {
            schema: Arc::new(Schema::new()),
            rows: Vec::new(),
        }
    }

    /// A table with a schema and no rows
    pub fn with_schema(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Assemble a table from rows that may carry different schema snapshots.
    ///
    /// The table schema is the union of every snapshot. Rows projected against
    /// an earlier, narrower snapshot are backfilled with nulls and re-coerced
    /// to the widened column types.
    pub fn from_rows(rows: Vec<Row>) -> Result<Table> {
        let Some(first) = rows.first() else {
            return Ok(Table::empty());
        };

        let mut schema = Arc::clone(first.schema());
        for row in &rows {
            if !Arc::ptr_eq(&schema, row.schema()) && *schema != **row.schema() {
                schema = Arc::new(schema.merge(row.schema()));
            }
        }

        let rows = rows
            .iter()
            .map(|row| row.widen_to(&schema))
            .collect::<Result<Vec<_>>>()?;

        Ok(Table { schema, rows })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&FieldValue>> {
        let position = self.schema.position(name)?;
        Some(self.rows.iter().map(|row| &row.values[position]).collect())
    }

    /// Rows as JSON objects
    pub fn to_json_rows(&self) -> Vec<JsonValue> {
        self.rows.iter().map(Row::to_json).collect()
    }
}
