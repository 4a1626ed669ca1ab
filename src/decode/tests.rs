//! Tests for decode module

use super::*;
use crate::record::{FieldValue, SCALAR_COLUMN};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_decode_root_array() {
    let (body, records) = PageDecoder::new()
        .decode(r#"[{"id": 1}, {"id": 2}]"#)
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].get("id"), Some(&FieldValue::Integer(2)));
    assert!(body.is_array());
}

#[test]
fn test_decode_with_path() {
    let (body, records) = PageDecoder::with_path("data.items")
        .decode(r#"{"data": {"items": [{"a": "x"}]}, "next": "c2"}"#)
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(body["next"], json!("c2"));
}

#[test]
fn test_decode_single_object() {
    let (_, records) = PageDecoder::new().decode(r#"{"id": 7}"#).unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn test_decode_missing_path_is_empty() {
    let (_, records) = PageDecoder::with_path("data")
        .decode(r#"{"other": []}"#)
        .unwrap();
    assert!(records.is_empty());

    let (_, records) = PageDecoder::with_path("data")
        .decode(r#"{"data": null}"#)
        .unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_decode_scalar_items() {
    let (_, records) = PageDecoder::new().decode("[1, 2, 3]").unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].get(SCALAR_COLUMN), Some(&FieldValue::Integer(1)));
}

#[test]
fn test_decode_invalid_json_is_malformed() {
    let err = PageDecoder::new().decode("<html>oops</html>").unwrap_err();
    assert!(matches!(err, crate::Error::MalformedResponse { .. }));
}

#[test]
fn test_decode_scalar_at_path_is_malformed() {
    let err = PageDecoder::with_path("data")
        .decode(r#"{"data": 5}"#)
        .unwrap_err();
    assert!(err.to_string().contains("number"));
}

#[test]
fn test_from_path_empty_is_root() {
    let (_, records) = PageDecoder::from_path(Some(""))
        .decode(r#"[{"id": 1}]"#)
        .unwrap();
    assert_eq!(records.len(), 1);
}
