//! Record coercion against a declared schema
//!
//! Raw API objects are validated field by field. Safely convertible
//! values are coerced (a number arriving for a declared string becomes
//! its string form), declared-but-absent fields materialize as null, and
//! anything else is a schema mismatch that rejects the record.

use super::types::{FieldSchema, FieldType, RecordSchema};
use crate::error::{Error, Result};
use serde_json::{Map, Number, Value};

/// Coerce a raw API object into the declared record shape
///
/// Returns the coerced record, or a `SchemaMismatch` error naming the
/// offending field path. Keys the API returns beyond the declared schema
/// pass through untouched. Coercion is idempotent: feeding the result
/// back in yields an identical record.
pub fn coerce_record(schema: &RecordSchema, raw: &Value) -> Result<Value> {
    let Value::Object(raw_map) = raw else {
        return Err(Error::schema_mismatch("$", "object", type_name(raw)));
    };

    coerce_object(&schema.properties, raw_map, None)
}

/// Resolve a dotted path inside a record value
///
/// Mirrors `RecordSchema::resolve` on the data side; used to read key
/// fields (primary keys, replication key) out of coerced records.
pub fn resolve_value<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// JSON type name of a value, for mismatch reporting
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn coerce_object(
    declared: &std::collections::BTreeMap<String, FieldSchema>,
    raw: &Map<String, Value>,
    parent: Option<&str>,
) -> Result<Value> {
    let mut out = Map::new();

    for (name, field) in declared {
        let path = match parent {
            Some(parent) => format!("{parent}.{name}"),
            None => name.clone(),
        };
        let coerced = match raw.get(name) {
            // Absent or null declared fields materialize as null
            None | Some(Value::Null) => Value::Null,
            Some(value) => coerce_field(field, value, &path)?,
        };
        out.insert(name.clone(), coerced);
    }

    // Undeclared keys pass through untouched
    for (name, value) in raw {
        if !declared.contains_key(name) {
            out.insert(name.clone(), value.clone());
        }
    }

    Ok(Value::Object(out))
}

fn coerce_field(field: &FieldSchema, value: &Value, path: &str) -> Result<Value> {
    let mismatch = || Error::schema_mismatch(path, field.field_type.as_str(), type_name(value));

    match field.field_type {
        FieldType::String => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(mismatch()),
        },
        FieldType::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::Number(n) => coerce_float_to_integer(n).ok_or_else(mismatch),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| Value::Number(i.into()))
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        FieldType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        FieldType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(mismatch()),
            },
            _ => Err(mismatch()),
        },
        FieldType::Object => match value {
            Value::Object(map) => coerce_object(&field.properties, map, Some(path)),
            _ => Err(mismatch()),
        },
        FieldType::Array => match value {
            Value::Array(items) => {
                let Some(item_schema) = &field.items else {
                    return Ok(value.clone());
                };
                let coerced: Result<Vec<Value>> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| coerce_field(item_schema, item, &format!("{path}[{i}]")))
                    .collect();
                Ok(Value::Array(coerced?))
            }
            _ => Err(mismatch()),
        },
    }
}

/// An integral float (e.g. 42.0) narrows to an integer; anything with a
/// fractional part does not convert safely.
fn coerce_float_to_integer(n: &Number) -> Option<Value> {
    let f = n.as_f64()?;
    // `i64::MAX as f64` rounds up to 2^63, one past the last i64, so the
    // upper bound is exclusive; `i64::MIN as f64` is exact
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(Value::Number(Number::from(f as i64)))
    } else {
        None
    }
}
