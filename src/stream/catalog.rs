//! Catalog types
//!
//! The discover command renders every stream definition into a catalog
//! document downstream tooling can consume.

use super::definition::StreamDefinition;
use crate::types::ReplicationMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A catalog of available streams
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Stream entries
    pub streams: Vec<CatalogEntry>,
}

/// One stream in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stream name
    pub stream: String,
    /// Stable stream identifier (same as the name)
    pub tap_stream_id: String,
    /// Record shape as draft-07 JSON Schema
    #[serde(rename = "schema")]
    pub json_schema: Value,
    /// Primary key field paths
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_properties: Vec<String>,
    /// Replication method (FULL_TABLE or INCREMENTAL)
    pub replication_method: ReplicationMode,
    /// Watermark field for incremental streams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,
}

impl CatalogEntry {
    /// Render a definition into a catalog entry
    pub fn from_definition(def: &StreamDefinition) -> Self {
        let replication = def.replication_config();
        Self {
            stream: def.name().to_string(),
            tap_stream_id: def.name().to_string(),
            json_schema: def.json_schema(),
            key_properties: replication.primary_keys.to_vec(),
            replication_method: replication.mode,
            replication_key: replication.key.map(str::to_string),
        }
    }
}

impl Catalog {
    /// Build a catalog from a set of definitions
    pub fn from_definitions(defs: &[StreamDefinition]) -> Self {
        Self {
            streams: defs.iter().map(CatalogEntry::from_definition).collect(),
        }
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
