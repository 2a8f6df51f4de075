//! Record extraction from Graph responses
//!
//! A collection response nests its records under `data`. Stream
//! definitions can override that for edges that nest differently: plain
//! dotted paths walk object keys, and paths starting with `$` are full
//! JSONPath expressions.

use crate::error::{Error, Result};
use serde_json::Value;

/// Extracts record objects from a response body
#[derive(Debug, Clone, Default)]
pub struct RecordExtractor {
    record_path: Option<String>,
}

impl RecordExtractor {
    /// Create an extractor that treats the whole body as the record set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor for a record path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            record_path: Some(path.into()),
        }
    }

    /// Extract records from a parsed response body
    pub fn extract(&self, body: &Value) -> Result<Vec<Value>> {
        let resolved = match &self.record_path {
            None => Some(body.clone()),
            Some(path) if path.starts_with('$') => {
                return extract_with_jsonpath(body, path);
            }
            Some(path) => resolve_dotted(body, path),
        };

        match resolved {
            Some(Value::Array(records)) => Ok(records),
            Some(Value::Object(obj)) => Ok(vec![Value::Object(obj)]),
            Some(Value::Null) | None => Ok(vec![]),
            Some(other) => Err(Error::RecordExtraction {
                path: self.record_path.clone().unwrap_or_else(|| "$".to_string()),
                message: format!(
                    "expected an array of records, found {}",
                    crate::schema::type_name(&other)
                ),
            }),
        }
    }
}

/// Walk object keys along a dotted path
fn resolve_dotted(value: &Value, path: &str) -> Option<Value> {
    let mut current = value;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current.clone())
}

/// Extract records with a JSONPath expression
fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path).map_err(|e| Error::JsonPath {
        message: format!("Invalid JSONPath '{path}': {e}"),
    })?;

    match jp.find(value) {
        Value::Array(records) => Ok(records),
        Value::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}
