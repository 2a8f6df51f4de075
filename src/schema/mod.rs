//! Record schema module
//!
//! Declared record shapes and the coercion that enforces them.
//!
//! # Features
//!
//! - **Declared Schemas**: Plain nested trees of typed field descriptors
//! - **Path Resolution**: Dotted-path lookup into nested objects
//! - **Coercion**: Safe conversions, null materialization, mismatch rejection
//! - **JSON Schema Output**: Draft-07 rendering for SCHEMA messages
mod coerce;
mod types;

pub use coerce::{coerce_record, resolve_value, type_name};
pub use types::{FieldSchema, FieldType, RecordSchema};

#[cfg(test)]
mod tests;
