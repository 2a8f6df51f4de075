//! Schema and coercion tests

use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;

fn rule_schema() -> RecordSchema {
    RecordSchema::new([
        ("id", FieldSchema::string()),
        ("name", FieldSchema::string()),
        (
            "created_by",
            FieldSchema::object([("id", FieldSchema::string()), ("name", FieldSchema::string())]),
        ),
        (
            "evaluation_spec",
            FieldSchema::object([
                ("evaluation_type", FieldSchema::string()),
                (
                    "filters",
                    FieldSchema::array(FieldSchema::object([
                        ("field", FieldSchema::string()),
                        ("value", FieldSchema::string()),
                        ("operator", FieldSchema::string()),
                    ])),
                ),
            ]),
        ),
        ("updated_time", FieldSchema::datetime()),
    ])
}

#[test]
fn test_resolve_top_level() {
    let schema = rule_schema();

    assert!(schema.contains("id"));
    assert!(schema.contains("updated_time"));
    assert!(!schema.contains("missing"));
}

#[test]
fn test_resolve_nested_path() {
    let schema = rule_schema();

    let field = schema.resolve("created_by.id").unwrap();
    assert_eq!(field.field_type, FieldType::String);

    assert!(schema.resolve("created_by.missing").is_none());
    // Array items are not path addressable
    assert!(schema.resolve("evaluation_spec.filters.field").is_none());
}

#[test]
fn test_orderable_types() {
    assert!(FieldType::String.is_orderable());
    assert!(FieldType::Integer.is_orderable());
    assert!(FieldType::Number.is_orderable());
    assert!(!FieldType::Object.is_orderable());
    assert!(!FieldType::Array.is_orderable());
    assert!(!FieldType::Boolean.is_orderable());
}

#[test]
fn test_json_schema_rendering() {
    let schema = RecordSchema::new([
        ("id", FieldSchema::string()),
        ("updated_time", FieldSchema::datetime()),
        (
            "created_by",
            FieldSchema::object([("id", FieldSchema::string())]),
        ),
    ]);

    let rendered = schema.to_json_schema(&["id".to_string()]);

    assert_eq!(
        rendered,
        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "updated_time": {"type": ["string", "null"], "format": "date-time"},
                "created_by": {
                    "type": ["object", "null"],
                    "properties": {
                        "id": {"type": ["string", "null"]}
                    },
                    "additionalProperties": true
                }
            },
            "required": ["id"],
            "additionalProperties": true
        })
    );
}

#[test]
fn test_json_schema_dotted_required_marks_root() {
    let schema = RecordSchema::new([
        ("id", FieldSchema::string()),
        (
            "created_by",
            FieldSchema::object([("id", FieldSchema::string())]),
        ),
    ]);

    let rendered = schema.to_json_schema(&["id".to_string(), "created_by.id".to_string()]);

    // A dotted key lists its top-level root, never a phantom property name
    assert_eq!(rendered["required"], json!(["created_by", "id"]));
    assert_eq!(rendered["properties"]["created_by"]["type"], json!("object"));
    assert_eq!(rendered["properties"]["id"]["type"], json!("string"));
}

#[test]
fn test_coerce_well_formed_record() {
    let schema = rule_schema();
    let raw = json!({
        "id": "6123",
        "name": "Pause low performers",
        "created_by": {"id": "88", "name": "Ops Bot"},
        "evaluation_spec": {
            "evaluation_type": "SCHEDULE",
            "filters": [
                {"field": "spent", "value": "1000", "operator": "GREATER_THAN"}
            ]
        },
        "updated_time": "2024-05-21T07:24:30+0000"
    });

    let coerced = coerce_record(&schema, &raw).unwrap();
    assert_eq!(coerced, raw);
}

#[test]
fn test_coerce_is_idempotent() {
    let schema = rule_schema();
    let raw = json!({
        "id": 6123,
        "name": "Pause low performers",
        "evaluation_spec": {"evaluation_type": "SCHEDULE"}
    });

    let once = coerce_record(&schema, &raw).unwrap();
    let twice = coerce_record(&schema, &once).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_coerce_number_to_declared_string() {
    let schema = RecordSchema::new([("id", FieldSchema::string())]);

    let coerced = coerce_record(&schema, &json!({"id": 6123})).unwrap();
    assert_eq!(coerced["id"], json!("6123"));
}

#[test]
fn test_coerce_string_to_declared_integer() {
    let schema = RecordSchema::new([("count", FieldSchema::integer())]);

    let coerced = coerce_record(&schema, &json!({"count": "42"})).unwrap();
    assert_eq!(coerced["count"], json!(42));

    let err = coerce_record(&schema, &json!({"count": "4.5"})).unwrap_err();
    assert!(err.is_record_error());
}

#[test]
fn test_coerce_float_to_declared_integer() {
    let schema = RecordSchema::new([("count", FieldSchema::integer())]);

    let coerced = coerce_record(&schema, &json!({"count": 42.0})).unwrap();
    assert_eq!(coerced["count"], json!(42));

    let err = coerce_record(&schema, &json!({"count": 42.5})).unwrap_err();
    assert!(err.is_record_error());

    // 2^63 is integral as f64 but one past i64::MAX; rejected, not saturated
    let err = coerce_record(&schema, &json!({"count": 9_223_372_036_854_775_808.0})).unwrap_err();
    assert!(err.is_record_error());

    // Largest integral f64 below 2^63 converts exactly
    let coerced =
        coerce_record(&schema, &json!({"count": 9_223_372_036_854_774_784.0})).unwrap();
    assert_eq!(coerced["count"], json!(9_223_372_036_854_774_784_i64));

    // i64::MIN has an exact f64 form and stays convertible
    let coerced =
        coerce_record(&schema, &json!({"count": -9_223_372_036_854_775_808.0})).unwrap();
    assert_eq!(coerced["count"], json!(i64::MIN));
}

#[test]
fn test_coerce_missing_nested_field_is_null() {
    let schema = rule_schema();
    // evaluation_spec present but filters absent; created_by absent entirely
    let raw = json!({
        "id": "1",
        "evaluation_spec": {"evaluation_type": "TRIGGER"}
    });

    let coerced = coerce_record(&schema, &raw).unwrap();
    assert_eq!(coerced["evaluation_spec"]["filters"], json!(null));
    assert_eq!(coerced["created_by"], json!(null));
    assert_eq!(coerced["name"], json!(null));
}

#[test]
fn test_coerce_mismatch_reports_path() {
    let schema = rule_schema();
    let raw = json!({
        "id": "1",
        "created_by": {"id": ["not", "a", "string"]}
    });

    let err = coerce_record(&schema, &raw).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Schema mismatch at 'created_by.id': expected string, got array"
    );
}

#[test]
fn test_coerce_array_items() {
    let schema = rule_schema();
    let raw = json!({
        "id": "1",
        "evaluation_spec": {
            "filters": [
                {"field": "spent", "value": 1000, "operator": "GREATER_THAN"}
            ]
        }
    });

    let coerced = coerce_record(&schema, &raw).unwrap();
    assert_eq!(
        coerced["evaluation_spec"]["filters"][0]["value"],
        json!("1000")
    );
}

#[test]
fn test_coerce_array_item_mismatch_reports_index() {
    let schema = RecordSchema::new([("tags", FieldSchema::array(FieldSchema::string()))]);

    let err = coerce_record(&schema, &json!({"tags": ["ok", {}]})).unwrap_err();
    assert!(err.to_string().contains("tags[1]"));
}

#[test]
fn test_coerce_preserves_undeclared_keys() {
    let schema = RecordSchema::new([("id", FieldSchema::string())]);
    let raw = json!({"id": "1", "surprise": {"deep": true}});

    let coerced = coerce_record(&schema, &raw).unwrap();
    assert_eq!(coerced["surprise"], json!({"deep": true}));
}

#[test]
fn test_coerce_non_object_record() {
    let schema = rule_schema();

    let err = coerce_record(&schema, &json!(["not", "an", "object"])).unwrap_err();
    assert!(err.to_string().contains("expected object"));
}

#[test]
fn test_resolve_value_paths() {
    let record = json!({
        "id": "1",
        "created_by": {"id": "88"}
    });

    assert_eq!(resolve_value(&record, "id"), Some(&json!("1")));
    assert_eq!(resolve_value(&record, "created_by.id"), Some(&json!("88")));
    assert_eq!(resolve_value(&record, "created_by.name"), None);
    assert_eq!(resolve_value(&record, "missing"), None);
}

#[test]
fn test_type_name() {
    assert_eq!(type_name(&json!(null)), "null");
    assert_eq!(type_name(&json!(true)), "boolean");
    assert_eq!(type_name(&json!(1)), "number");
    assert_eq!(type_name(&json!("s")), "string");
    assert_eq!(type_name(&json!([])), "array");
    assert_eq!(type_name(&json!({})), "object");
}
