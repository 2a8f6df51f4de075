//! Declared schema to Arrow conversion
//!
//! The record schema a stream declares maps directly onto an Arrow
//! schema; coerced records are converted column by column. Nothing is
//! inferred from the data, so every batch of a stream carries the
//! identical Arrow schema regardless of which fields the API filled in.

use crate::error::{Error, Result};
use crate::schema::{FieldSchema, FieldType, RecordSchema};
use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, ListArray, StringArray, StructArray,
};
use arrow::buffer::OffsetBuffer;
use arrow::datatypes::{DataType, Field, Fields, Schema};
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use std::sync::Arc;

/// Render a declared record schema as an Arrow schema
///
/// Every column is nullable; the API omits fields freely and coercion
/// materializes the gaps as nulls.
pub fn record_schema_to_arrow(schema: &RecordSchema) -> Schema {
    let fields: Vec<Field> = schema
        .properties
        .iter()
        .map(|(name, field)| Field::new(name, field_data_type(field), true))
        .collect();

    Schema::new(fields)
}

fn field_data_type(field: &FieldSchema) -> DataType {
    match field.field_type {
        FieldType::String => DataType::Utf8,
        FieldType::Integer => DataType::Int64,
        FieldType::Number => DataType::Float64,
        FieldType::Boolean => DataType::Boolean,
        FieldType::Object => {
            let children: Vec<Field> = field
                .properties
                .iter()
                .map(|(name, child)| Field::new(name, field_data_type(child), true))
                .collect();
            DataType::Struct(Fields::from(children))
        }
        FieldType::Array => {
            let item_type = field
                .items
                .as_deref()
                .map_or(DataType::Utf8, field_data_type);
            DataType::List(Arc::new(Field::new("item", item_type, true)))
        }
    }
}

/// Convert coerced records into an Arrow batch
///
/// Columns follow the declaration; keys the API returned beyond it have
/// no column and are dropped here.
pub fn json_to_arrow(records: &[Value], schema: &RecordSchema) -> Result<RecordBatch> {
    let arrow_schema = Arc::new(record_schema_to_arrow(schema));

    if records.is_empty() {
        return Ok(RecordBatch::new_empty(arrow_schema));
    }

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(arrow_schema.fields().len());
    for field in arrow_schema.fields() {
        let values: Vec<Option<&Value>> = records
            .iter()
            .map(|record| record.get(field.name()).filter(|v| !v.is_null()))
            .collect();
        columns.push(build_array(&values, field.data_type())?);
    }

    Ok(RecordBatch::try_new(arrow_schema, columns)?)
}

/// Build one Arrow column from per-row JSON values
fn build_array(values: &[Option<&Value>], data_type: &DataType) -> Result<ArrayRef> {
    match data_type {
        DataType::Boolean => {
            let arr: BooleanArray = values.iter().map(|v| v.and_then(Value::as_bool)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Int64 => {
            let arr: Int64Array = values.iter().map(|v| v.and_then(Value::as_i64)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Float64 => {
            let arr: Float64Array = values.iter().map(|v| v.and_then(Value::as_f64)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Utf8 => {
            let arr: StringArray = values
                .iter()
                .map(|v| {
                    v.map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                })
                .collect();
            Ok(Arc::new(arr))
        }

        DataType::List(field) => build_list_array(values, field),

        DataType::Struct(fields) => build_struct_array(values, fields),

        other => Err(Error::output(format!(
            "No column builder for Arrow type {other}"
        ))),
    }
}

fn build_list_array(values: &[Option<&Value>], field: &Arc<Field>) -> Result<ArrayRef> {
    let mut items: Vec<Option<&Value>> = Vec::new();
    let mut offsets: Vec<i32> = vec![0];
    let mut validity: Vec<bool> = Vec::with_capacity(values.len());

    for value in values {
        if let Some(Value::Array(arr)) = value {
            for item in arr {
                items.push(Some(item).filter(|v| !v.is_null()));
            }
            validity.push(true);
        } else {
            validity.push(false);
        }
        let offset = i32::try_from(items.len())
            .map_err(|_| Error::output("Array column exceeds i32 offset range"))?;
        offsets.push(offset);
    }

    let item_array = build_array(&items, field.data_type())?;
    let list = ListArray::new(
        Arc::clone(field),
        OffsetBuffer::new(offsets.into()),
        item_array,
        Some(validity.into()),
    );
    Ok(Arc::new(list))
}

fn build_struct_array(values: &[Option<&Value>], fields: &Fields) -> Result<ArrayRef> {
    let mut children: Vec<ArrayRef> = Vec::with_capacity(fields.len());

    for field in fields {
        let child_values: Vec<Option<&Value>> = values
            .iter()
            .map(|v| {
                v.and_then(|v| v.get(field.name()))
                    .filter(|v| !v.is_null())
            })
            .collect();
        children.push(build_array(&child_values, field.data_type())?);
    }

    let validity: Vec<bool> = values.iter().map(Option::is_some).collect();
    let arr = StructArray::new(fields.clone(), children, Some(validity.into()));
    Ok(Arc::new(arr))
}

/// Convert an Arrow batch back into JSON records, one object per row
///
/// Only the types a declared schema can produce are handled; anything
/// else means the batch did not come from [`json_to_arrow`].
pub fn arrow_to_json(batch: &RecordBatch) -> Result<Vec<Value>> {
    let schema = batch.schema();
    let mut records = Vec::with_capacity(batch.num_rows());

    for row in 0..batch.num_rows() {
        let mut record = serde_json::Map::new();
        for (col, field) in schema.fields().iter().enumerate() {
            let value = array_value_to_json(batch.column(col).as_ref(), row)?;
            record.insert(field.name().clone(), value);
        }
        records.push(Value::Object(record));
    }

    Ok(records)
}

fn array_value_to_json(array: &dyn arrow::array::Array, row: usize) -> Result<Value> {
    use arrow::array::Array;

    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let downcast_failed =
        || Error::output(format!("Failed to downcast {} column", array.data_type()));

    match array.data_type() {
        DataType::Boolean => {
            let arr = array
                .as_any()
                .downcast_ref::<BooleanArray>()
                .ok_or_else(downcast_failed)?;
            Ok(Value::Bool(arr.value(row)))
        }

        DataType::Int64 => {
            let arr = array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(downcast_failed)?;
            Ok(Value::Number(arr.value(row).into()))
        }

        DataType::Float64 => {
            let arr = array
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(downcast_failed)?;
            Ok(serde_json::Number::from_f64(arr.value(row)).map_or(Value::Null, Value::Number))
        }

        DataType::Utf8 => {
            let arr = array
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(downcast_failed)?;
            Ok(Value::String(arr.value(row).to_string()))
        }

        DataType::List(_) => {
            let arr = array
                .as_any()
                .downcast_ref::<ListArray>()
                .ok_or_else(downcast_failed)?;
            let values = arr.value(row);
            let mut items = Vec::with_capacity(values.len());
            for i in 0..values.len() {
                items.push(array_value_to_json(values.as_ref(), i)?);
            }
            Ok(Value::Array(items))
        }

        DataType::Struct(_) => {
            let arr = array
                .as_any()
                .downcast_ref::<StructArray>()
                .ok_or_else(downcast_failed)?;
            let mut obj = serde_json::Map::new();
            for (i, field) in arr.fields().iter().enumerate() {
                obj.insert(
                    field.name().clone(),
                    array_value_to_json(arr.column(i).as_ref(), row)?,
                );
            }
            Ok(Value::Object(obj))
        }

        other => Err(Error::output(format!(
            "No JSON rendering for Arrow type {other}"
        ))),
    }
}
