//! Tests for output module

use super::*;
use crate::record::{FieldValue, Record};
use crate::schema::{ColumnType, Schema, SchemaReconciler, TypeKind};
use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn rows_for(values: &[serde_json::Value]) -> Vec<Row> {
    let records: Vec<Record> = values.iter().map(Record::from_json).collect();
    let mut reconciler = SchemaReconciler::new();
    reconciler.observe_all(&records);
    let schema = Arc::new(reconciler.finalize());
    reconciler.project_all(&records, &schema).unwrap()
}

/// Project each page against the schema as it stood after that page
fn eager_rows(pages: &[Vec<serde_json::Value>]) -> Vec<Row> {
    let mut reconciler = SchemaReconciler::new();
    let mut rows = Vec::new();
    for page in pages {
        let records: Vec<Record> = page.iter().map(Record::from_json).collect();
        reconciler.observe_all(&records);
        let snapshot = Arc::new(reconciler.finalize());
        rows.extend(reconciler.project_all(&records, &snapshot).unwrap());
    }
    rows
}

// ============================================================================
// Row Tests
// ============================================================================

#[test]
fn test_row_accessors() {
    let rows = rows_for(&[json!({"id": 1, "name": "a"})]);
    let row = &rows[0];
    assert_eq!(row.len(), 2);
    assert_eq!(row.get("id"), Some(&FieldValue::Integer(1)));
    assert_eq!(row.get("missing"), None);
    assert_eq!(row.values()[1], FieldValue::String("a".to_string()));
}

#[test]
fn test_row_to_json_keeps_column_order() {
    let rows = rows_for(&[json!({"b": 1, "a": true})]);
    let text = rows[0].to_json().to_string();
    assert_eq!(text, r#"{"b":1,"a":true}"#);
}

// ============================================================================
// Table Tests
// ============================================================================

#[test]
fn test_table_from_no_rows() {
    let table = Table::from_rows(vec![]).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.num_columns(), 0);
}

#[test]
fn test_table_from_rows_shared_schema() {
    let table = Table::from_rows(rows_for(&[json!({"id": 1}), json!({"id": 2})])).unwrap();
    assert_eq!(table.num_rows(), 2);
    assert_eq!(
        table.column("id"),
        Some(vec![&FieldValue::Integer(1), &FieldValue::Integer(2)])
    );
}

#[test]
fn test_table_backfills_rows_from_narrower_snapshots() {
    let rows = eager_rows(&[
        vec![json!({"id": 1})],
        vec![json!({"id": 2, "name": "x"})],
    ]);
    assert_eq!(rows[0].len(), 1);

    let table = Table::from_rows(rows).unwrap();
    assert_eq!(table.schema().to_string(), "[id:integer, name:nullable-string]");
    assert_eq!(
        table.to_json_rows(),
        vec![json!({"id": 1, "name": null}), json!({"id": 2, "name": "x"})]
    );
}

#[test]
fn test_table_recoerces_widened_columns() {
    let rows = eager_rows(&[vec![json!({"v": 1})], vec![json!({"v": 2.5})], vec![json!({"v": "z"})]]);
    let table = Table::from_rows(rows).unwrap();
    assert_eq!(table.schema().column_type("v"), Some(ColumnType::of(TypeKind::String)));
    assert_eq!(
        table.column("v"),
        Some(vec![
            &FieldValue::String("1".to_string()),
            &FieldValue::String("2.5".to_string()),
            &FieldValue::String("z".to_string()),
        ])
    );
}

// ============================================================================
// Arrow Tests
// ============================================================================

#[test]
fn test_arrow_schema_mapping() {
    let schema = Schema::from_columns([
        ("i", ColumnType::of(TypeKind::Integer)),
        ("f", ColumnType::nullable(TypeKind::Float)),
        ("o", ColumnType::of(TypeKind::Object)),
        ("u", ColumnType::nullable(TypeKind::Unresolved)),
    ]);
    let arrow_schema = to_arrow_schema(&schema);
    assert_eq!(arrow_schema.field(0).data_type(), &DataType::Int64);
    assert!(!arrow_schema.field(0).is_nullable());
    assert_eq!(arrow_schema.field(1).data_type(), &DataType::Float64);
    assert!(arrow_schema.field(1).is_nullable());
    assert_eq!(arrow_schema.field(2).data_type(), &DataType::Utf8);
    assert_eq!(arrow_schema.field(3).data_type(), &DataType::Null);
}

#[test]
fn test_to_record_batch() {
    let table = Table::from_rows(rows_for(&[
        json!({"id": 1, "score": 1.5, "tags": ["a"]}),
        json!({"id": 2, "score": null, "tags": []}),
    ]))
    .unwrap();

    let batch = table.to_record_batch().unwrap();
    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.num_columns(), 3);

    let ids = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
    assert_eq!(ids.value(1), 2);

    let scores = batch.column(1).as_any().downcast_ref::<Float64Array>().unwrap();
    assert_eq!(scores.value(0), 1.5);
    assert!(scores.is_null(1));

    let tags = batch.column(2).as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(tags.value(0), r#"["a"]"#);
}

#[test]
fn test_empty_table_to_record_batch() {
    let batch = Table::empty().to_record_batch().unwrap();
    assert_eq!(batch.num_rows(), 0);
    assert_eq!(batch.num_columns(), 0);
}
