//! Decoded records and their field values
//!
//! A [`Record`] is one JSON object from a page, kept in the key order the
//! server sent it. Values are held as a closed [`FieldValue`] enum so the
//! schema lattice can work purely on tags.

use crate::schema::TypeKind;
use crate::types::{JsonObject, JsonValue};

/// Column name used when a page's record array holds non-object items
pub const SCALAR_COLUMN: &str = "value";

/// A single dynamically-typed field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    /// Nested object, kept opaque unless flattening is enabled
    Object(JsonObject),
    /// Nested array, always an opaque leaf
    Array(Vec<JsonValue>),
}

impl FieldValue {
    /// Convert a JSON value into its tagged form
    #[allow(clippy::cast_precision_loss)]
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::Boolean(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    // Out of i64 range
                    FieldValue::Float(u as f64)
                } else {
                    FieldValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => FieldValue::String(s.clone()),
            JsonValue::Array(items) => FieldValue::Array(items.clone()),
            JsonValue::Object(map) => FieldValue::Object(map.clone()),
        }
    }

    /// Convert back to JSON. Non-finite floats become null.
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Integer(i) => JsonValue::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(JsonValue::Null, JsonValue::Number),
            FieldValue::Boolean(b) => JsonValue::Bool(*b),
            FieldValue::String(s) => JsonValue::String(s.clone()),
            FieldValue::Object(map) => JsonValue::Object(map.clone()),
            FieldValue::Array(items) => JsonValue::Array(items.clone()),
        }
    }

    /// The concrete type tag, `None` for null
    pub fn kind(&self) -> Option<TypeKind> {
        match self {
            FieldValue::Null => None,
            FieldValue::Integer(_) => Some(TypeKind::Integer),
            FieldValue::Float(_) => Some(TypeKind::Float),
            FieldValue::Boolean(_) => Some(TypeKind::Boolean),
            FieldValue::String(_) => Some(TypeKind::String),
            FieldValue::Object(_) => Some(TypeKind::Object),
            FieldValue::Array(_) => Some(TypeKind::Array),
        }
    }

    /// Check for null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Textual form used when a column widens to string
    pub fn to_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::String(s) => Some(s.clone()),
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Boolean(b) => Some(b.to_string()),
            other => Some(other.to_json().to_string()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&JsonValue> for FieldValue {
    fn from(value: &JsonValue) -> Self {
        FieldValue::from_json(value)
    }
}

/// One decoded record: ordered field names and values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON object, keeping key order
    pub fn from_object(map: &JsonObject) -> Self {
        Self {
            fields: map
                .iter()
                .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
                .collect(),
        }
    }

    /// Build a record from any JSON value.
    ///
    /// Objects map field by field; anything else becomes a single
    /// [`SCALAR_COLUMN`] field.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Object(map) => Self::from_object(map),
            other => Self {
                fields: vec![(SCALAR_COLUMN.to_string(), FieldValue::from_json(other))],
            },
        }
    }

    /// Append a field
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Iterate fields in source order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert back to a JSON object
    pub fn to_json(&self) -> JsonValue {
        let mut map = JsonObject::new();
        for (k, v) in &self.fields {
            map.insert(k.clone(), v.to_json());
        }
        JsonValue::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_value_from_json() {
        assert_eq!(FieldValue::from_json(&json!(null)), FieldValue::Null);
        assert_eq!(FieldValue::from_json(&json!(3)), FieldValue::Integer(3));
        assert_eq!(FieldValue::from_json(&json!(2.5)), FieldValue::Float(2.5));
        assert_eq!(FieldValue::from_json(&json!(true)), FieldValue::Boolean(true));
        assert_eq!(
            FieldValue::from_json(&json!("x")),
            FieldValue::String("x".to_string())
        );
        assert!(matches!(
            FieldValue::from_json(&json!({"a": 1})),
            FieldValue::Object(_)
        ));
        assert!(matches!(
            FieldValue::from_json(&json!([1, 2])),
            FieldValue::Array(_)
        ));
    }

    #[test]
    fn test_huge_unsigned_becomes_float() {
        let v = FieldValue::from_json(&json!(u64::MAX));
        assert_eq!(v.kind(), Some(TypeKind::Float));
    }

    #[test]
    fn test_to_text() {
        assert_eq!(FieldValue::Integer(5).to_text(), Some("5".to_string()));
        assert_eq!(FieldValue::Float(1.5).to_text(), Some("1.5".to_string()));
        assert_eq!(FieldValue::Boolean(false).to_text(), Some("false".to_string()));
        assert_eq!(FieldValue::Null.to_text(), None);
        let obj = FieldValue::from_json(&json!({"a": 1}));
        assert_eq!(obj.to_text(), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn test_record_preserves_key_order() {
        let record = Record::from_json(&json!({"zeta": 1, "alpha": 2, "mid": 3}));
        let keys: Vec<_> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(record.get("alpha"), Some(&FieldValue::Integer(2)));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_scalar_item_becomes_value_column() {
        let record = Record::from_json(&json!("plain"));
        assert_eq!(record.len(), 1);
        assert_eq!(
            record.get(SCALAR_COLUMN),
            Some(&FieldValue::String("plain".to_string()))
        );
    }

    #[test]
    fn test_record_to_json() {
        let value = json!({"id": 1, "tags": ["a"], "meta": {"k": null}});
        assert_eq!(Record::from_json(&value).to_json(), value);
    }
}
