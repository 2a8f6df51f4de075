//! Output module
//!
//! Handles Arrow RecordBatch creation and Parquet file writing.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Rendering declared record schemas as Arrow schemas
//! - Converting coerced records to Arrow RecordBatches and back
//! - Writing Parquet files, one per stream and account

mod schema;
mod writer;

pub use schema::{arrow_to_json, json_to_arrow, record_schema_to_arrow};
pub use writer::{output_file_name, write_batches_to_parquet, ParquetWriter, ParquetWriterConfig};
