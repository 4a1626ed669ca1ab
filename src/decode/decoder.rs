//! JSON page decoder

use crate::error::{Error, Result};
use crate::record::Record;
use crate::types::{lookup_path, JsonValue};

/// JSON decoder with optional record path extraction
#[derive(Debug, Clone, Default)]
pub struct PageDecoder {
    /// Dotted path to the records
    records_path: Option<String>,
}

impl PageDecoder {
    /// Create a decoder that reads records from the body root
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with a record path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            records_path: Some(path.into()),
        }
    }

    /// Create from an optional path, treating an empty path as unset
    pub fn from_path(path: Option<&str>) -> Self {
        match path {
            Some(path) if !path.is_empty() => Self::with_path(path),
            _ => Self::new(),
        }
    }

    /// Parse a body and extract its records.
    ///
    /// An array yields one record per item, an object a single record, and
    /// null or a missing path no records. Any other value is malformed.
    pub fn decode(&self, body: &str) -> Result<(JsonValue, Vec<Record>)> {
        let value: JsonValue = serde_json::from_str(body)
            .map_err(|e| Error::malformed(format!("Failed to parse JSON: {e}")))?;
        let records = self.extract_records(&value)?;
        Ok((value, records))
    }

    fn extract_records(&self, value: &JsonValue) -> Result<Vec<Record>> {
        let target = match &self.records_path {
            Some(path) => lookup_path(value, path),
            None => Some(value),
        };

        match target {
            None | Some(JsonValue::Null) => Ok(Vec::new()),
            Some(JsonValue::Array(items)) => Ok(items.iter().map(Record::from_json).collect()),
            Some(object @ JsonValue::Object(_)) => Ok(vec![Record::from_json(object)]),
            Some(other) => Err(Error::malformed(format!(
                "expected records at '{}', found {}",
                self.records_path.as_deref().unwrap_or("$"),
                json_type_name(other)
            ))),
        }
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
