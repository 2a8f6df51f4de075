//! Record schema types
//!
//! A stream declares the shape of its records as a finite tree of typed
//! field descriptors. The tree is plain data: the engine walks it to
//! validate and coerce raw API objects, and it renders to a draft-07
//! JSON Schema for SCHEMA messages and catalog output.

use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Type of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl FieldType {
    /// Check if values of this type support ordering comparisons
    ///
    /// Replication keys must be orderable so the bookmark can advance.
    pub fn is_orderable(&self) -> bool {
        matches!(
            self,
            FieldType::String | FieldType::Integer | FieldType::Number
        )
    }

    /// JSON Schema type name
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Schema of a single field
///
/// Composite fields carry `properties` (objects) or `items` (arrays).
/// Ownership makes the tree structurally acyclic.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// The declared type
    pub field_type: FieldType,

    /// Format hint (e.g., "date-time")
    pub format: Option<String>,

    /// Named sub-fields (objects only)
    pub properties: BTreeMap<String, FieldSchema>,

    /// Item schema (arrays only)
    pub items: Option<Box<FieldSchema>>,
}

impl FieldSchema {
    fn scalar(field_type: FieldType) -> Self {
        Self {
            field_type,
            format: None,
            properties: BTreeMap::new(),
            items: None,
        }
    }

    /// A plain string field
    pub fn string() -> Self {
        Self::scalar(FieldType::String)
    }

    /// A string field holding an ISO-8601 timestamp
    pub fn datetime() -> Self {
        Self::scalar(FieldType::String).with_format("date-time")
    }

    /// An integer field
    pub fn integer() -> Self {
        Self::scalar(FieldType::Integer)
    }

    /// A floating-point field
    pub fn number() -> Self {
        Self::scalar(FieldType::Number)
    }

    /// A boolean field
    pub fn boolean() -> Self {
        Self::scalar(FieldType::Boolean)
    }

    /// An object field with named sub-fields
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldSchema)>,
        K: Into<String>,
    {
        Self {
            field_type: FieldType::Object,
            format: None,
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
            items: None,
        }
    }

    /// An array field with the given item schema
    pub fn array(items: FieldSchema) -> Self {
        Self {
            field_type: FieldType::Array,
            format: None,
            properties: BTreeMap::new(),
            items: Some(Box::new(items)),
        }
    }

    /// Set format hint
    #[must_use]
    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    /// Resolve a dotted path relative to this field
    ///
    /// Descends object properties only; array items are not addressable
    /// by path (key fields never live inside arrays).
    pub fn resolve(&self, path: &str) -> Option<&FieldSchema> {
        let mut current = self;
        for part in path.split('.') {
            current = current.properties.get(part)?;
        }
        Some(current)
    }

    /// Render to a JSON Schema property value
    ///
    /// `nullable` widens the type to `[T, "null"]`; the upstream API omits
    /// fields freely, so everything but required key fields is nullable.
    pub fn to_json_schema(&self, nullable: bool) -> Value {
        let type_value = if nullable {
            json!([self.field_type.as_str(), "null"])
        } else {
            json!(self.field_type.as_str())
        };

        let mut out = Map::new();
        out.insert("type".to_string(), type_value);

        if let Some(format) = &self.format {
            out.insert("format".to_string(), json!(format));
        }

        match self.field_type {
            FieldType::Object => {
                let props: Map<String, Value> = self
                    .properties
                    .iter()
                    .map(|(name, field)| (name.clone(), field.to_json_schema(true)))
                    .collect();
                out.insert("properties".to_string(), Value::Object(props));
                out.insert("additionalProperties".to_string(), json!(true));
            }
            FieldType::Array => {
                if let Some(items) = &self.items {
                    out.insert("items".to_string(), items.to_json_schema(true));
                }
            }
            _ => {}
        }

        Value::Object(out)
    }
}

/// Schema of a whole record: the top-level field tree
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSchema {
    /// Top-level fields by name
    pub properties: BTreeMap<String, FieldSchema>,
}

impl RecordSchema {
    /// Build a record schema from (name, field) pairs
    pub fn new<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldSchema)>,
        K: Into<String>,
    {
        Self {
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        }
    }

    /// Resolve a dotted path (e.g., "created_by.id") to a field schema
    pub fn resolve(&self, path: &str) -> Option<&FieldSchema> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        let field = self.properties.get(head)?;
        match rest {
            Some(rest) => field.resolve(rest),
            None => Some(field),
        }
    }

    /// Check whether a path resolves inside the schema
    pub fn contains(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }

    /// Top-level field names
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Render to a draft-07 JSON Schema document
    ///
    /// The top-level root of each `required` key is emitted non-nullable
    /// and collected into the schema's `required` array, which is how
    /// primary-key fields stay visibly mandatory to downstream consumers.
    pub fn to_json_schema(&self, required: &[String]) -> Value {
        // A dotted key such as "created_by.id" pins its top-level root:
        // the record must carry `created_by` for the key to resolve
        let required_roots: BTreeSet<&str> = required
            .iter()
            .map(|key| key.split('.').next().unwrap_or(key.as_str()))
            .collect();

        let props: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, field)| {
                let nullable = !required_roots.contains(name.as_str());
                (name.clone(), field.to_json_schema(nullable))
            })
            .collect();

        let mut out = Map::new();
        out.insert(
            "$schema".to_string(),
            json!("http://json-schema.org/draft-07/schema#"),
        );
        out.insert("type".to_string(), json!("object"));
        out.insert("properties".to_string(), Value::Object(props));
        if !required_roots.is_empty() {
            out.insert("required".to_string(), json!(required_roots));
        }
        out.insert("additionalProperties".to_string(), json!(true));

        Value::Object(out)
    }
}
