//! Arrow conversion for materialized tables
//!
//! Builds one Arrow array per column from the already-typed row values.
//! Nested objects and arrays are opaque leaves and are written as JSON text.

use super::table::Table;
use crate::error::{Error, Result};
use crate::record::FieldValue;
use crate::schema::{Column, Schema, TypeKind};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, NullArray, StringArray};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Arrow data type for a reconciled column kind
pub fn arrow_type(kind: TypeKind) -> DataType {
    match kind {
        TypeKind::Unresolved => DataType::Null,
        TypeKind::Integer => DataType::Int64,
        TypeKind::Float => DataType::Float64,
        TypeKind::Boolean => DataType::Boolean,
        TypeKind::String | TypeKind::Object | TypeKind::Array => DataType::Utf8,
    }
}

/// Convert a reconciled schema to an Arrow schema
pub fn to_arrow_schema(schema: &Schema) -> ArrowSchema {
    let fields: Vec<Field> = schema
        .columns()
        .iter()
        .map(|column| {
            let nullable =
                column.column_type.nullable || column.column_type.kind == TypeKind::Unresolved;
            Field::new(&column.name, arrow_type(column.column_type.kind), nullable)
        })
        .collect();
    ArrowSchema::new(fields)
}

impl Table {
    /// Convert this table to an Arrow RecordBatch
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let arrow_schema = Arc::new(to_arrow_schema(self.schema()));

        if self.schema().is_empty() {
            return Ok(RecordBatch::new_empty(arrow_schema));
        }

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.num_columns());
        for (position, column) in self.schema().columns().iter().enumerate() {
            let values: Vec<&FieldValue> =
                self.rows().iter().map(|row| &row.values()[position]).collect();
            columns.push(build_array(column, &values)?);
        }

        RecordBatch::try_new(arrow_schema, columns).map_err(|e| Error::Output {
            message: format!("Failed to create RecordBatch: {e}"),
        })
    }
}

/// Build an Arrow array for one column
fn build_array(column: &Column, values: &[&FieldValue]) -> Result<ArrayRef> {
    match column.column_type.kind {
        TypeKind::Unresolved => Ok(Arc::new(NullArray::new(values.len()))),

        TypeKind::Boolean => {
            let arr: BooleanArray = values.iter().map(|v| v.as_bool()).collect();
            Ok(Arc::new(arr))
        }

        TypeKind::Integer => {
            let arr: Int64Array = values.iter().map(|v| v.as_i64()).collect();
            Ok(Arc::new(arr))
        }

        TypeKind::Float => {
            let arr: Float64Array = values.iter().map(|v| v.as_f64()).collect();
            Ok(Arc::new(arr))
        }

        TypeKind::String | TypeKind::Object | TypeKind::Array => {
            let arr: StringArray = values.iter().map(|v| v.to_text()).collect();
            Ok(Arc::new(arr))
        }
    }
}
