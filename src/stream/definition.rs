//! Stream definitions
//!
//! A stream definition is an immutable declaration of what to extract:
//! the remote fields to request, the resource path template, the record
//! schema, and replication metadata. The sync engine consumes it through
//! read-only accessors; definitions never change after construction.
//!
//! Definitions are built through [`StreamDefinitionBuilder`], whose
//! `build()` enforces every structural invariant. A definition that
//! builds successfully cannot fail validation later.

use crate::error::{Error, Result};
use crate::schema::RecordSchema;
use crate::template::{self, RequestContext};
use crate::types::ReplicationMode;
use serde_json::Value;

/// Replication declaration of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replication {
    /// Full table or incremental
    pub mode: ReplicationMode,
    /// Watermark field for incremental streams
    pub key: Option<String>,
}

impl Replication {
    /// Full-table replication: every run fetches everything
    pub fn full_table() -> Self {
        Self {
            mode: ReplicationMode::FullTable,
            key: None,
        }
    }

    /// Incremental replication bounded by the given watermark field
    pub fn incremental(key: impl Into<String>) -> Self {
        Self {
            mode: ReplicationMode::Incremental,
            key: Some(key.into()),
        }
    }
}

/// Read-only replication view handed to the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicationConfig<'a> {
    /// Replication mode
    pub mode: ReplicationMode,
    /// Watermark field (incremental streams)
    pub key: Option<&'a str>,
    /// Fields identifying a record for upsert/dedup
    pub primary_keys: &'a [String],
}

/// An immutable stream declaration
///
/// Fields are private: after `build()`, the definition is pure data read
/// through accessors, safe to share by reference across workers.
#[derive(Debug, Clone)]
pub struct StreamDefinition {
    name: String,
    fields: Vec<String>,
    path: String,
    record_path: String,
    schema: RecordSchema,
    primary_keys: Vec<String>,
    replication: Replication,
    filter_entity: Option<String>,
}

impl StreamDefinition {
    /// Start building a definition
    pub fn builder(name: impl Into<String>) -> StreamDefinitionBuilder {
        StreamDefinitionBuilder::new(name)
    }

    /// Stream name, used for routing, logging and output labeling
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered field names requested from the API
    pub fn request_fields(&self) -> &[String] {
        &self.fields
    }

    /// Render the resource path for one request context
    ///
    /// The field list is joined with commas and injected as `{{ fields }}`;
    /// everything else comes from the context (account id, config vars).
    pub fn resource_path(&self, ctx: &RequestContext) -> Result<String> {
        let mut ctx = ctx.clone();
        ctx.set_var("fields", Value::String(self.fields.join(",")));
        template::render(&self.path, &ctx)
    }

    /// The declared record schema
    pub fn record_schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Replication metadata: mode, watermark key, primary keys
    pub fn replication_config(&self) -> ReplicationConfig<'_> {
        ReplicationConfig {
            mode: self.replication.mode,
            key: self.replication.key.as_deref(),
            primary_keys: &self.primary_keys,
        }
    }

    /// Where records live in the response envelope
    pub fn record_path(&self) -> &str {
        &self.record_path
    }

    /// Primary key field paths
    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    /// Watermark field, if incremental
    pub fn replication_key(&self) -> Option<&str> {
        self.replication.key.as_deref()
    }

    /// Check if this stream replicates incrementally
    pub fn is_incremental(&self) -> bool {
        self.replication.mode == ReplicationMode::Incremental
    }

    /// Entity name qualifying the incremental filter predicate
    ///
    /// The Graph `filtering` parameter addresses the watermark as
    /// `<entity>.<key>`; the entity defaults to the stream name.
    pub fn filter_entity(&self) -> &str {
        self.filter_entity.as_deref().unwrap_or(&self.name)
    }

    /// Draft-07 JSON Schema of the record shape
    ///
    /// Primary-key fields are listed as `required` so their mandatory
    /// nature is visible to downstream consumers.
    pub fn json_schema(&self) -> Value {
        self.schema.to_json_schema(&self.primary_keys)
    }
}

/// Builder for [`StreamDefinition`]
///
/// `build()` validates the whole declaration and is the only way to
/// obtain a definition.
#[derive(Debug, Clone)]
pub struct StreamDefinitionBuilder {
    name: String,
    fields: Vec<String>,
    path: String,
    record_path: String,
    schema: RecordSchema,
    primary_keys: Vec<String>,
    replication: Replication,
    filter_entity: Option<String>,
}

impl StreamDefinitionBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            path: String::new(),
            record_path: "data".to_string(),
            schema: RecordSchema::default(),
            primary_keys: Vec::new(),
            replication: Replication::full_table(),
            filter_entity: None,
        }
    }

    /// Set the ordered request field list
    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the resource path template
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set where records live in the response envelope (default "data")
    #[must_use]
    pub fn record_path(mut self, record_path: impl Into<String>) -> Self {
        self.record_path = record_path.into();
        self
    }

    /// Set the record schema
    #[must_use]
    pub fn schema(mut self, schema: RecordSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Set the primary key field paths
    #[must_use]
    pub fn primary_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Declare full-table replication
    #[must_use]
    pub fn full_table(mut self) -> Self {
        self.replication = Replication::full_table();
        self
    }

    /// Declare incremental replication on the given watermark field
    #[must_use]
    pub fn incremental(mut self, key: impl Into<String>) -> Self {
        self.replication = Replication::incremental(key);
        self
    }

    /// Override the filter entity (defaults to the stream name)
    #[must_use]
    pub fn filter_entity(mut self, entity: impl Into<String>) -> Self {
        self.filter_entity = Some(entity.into());
        self
    }

    /// Validate and freeze the definition
    ///
    /// Any violation is an `InvalidDefinition` error raised here, before
    /// any request could be made.
    pub fn build(self) -> Result<StreamDefinition> {
        let invalid = |message: String| Error::invalid_definition(&self.name, message);

        if self.name.is_empty() {
            return Err(Error::invalid_definition("", "name must not be empty"));
        }
        if self.fields.is_empty() {
            return Err(invalid("fields must not be empty".to_string()));
        }
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.as_str()) {
                return Err(invalid(format!("duplicate request field '{field}'")));
            }
        }

        if !self.path.starts_with('/') {
            return Err(invalid(format!(
                "path must start with '/', got '{}'",
                self.path
            )));
        }
        for var in template::extract_variables(&self.path) {
            let known = var == "fields" || var == "account_id" || var.starts_with("config.");
            if !known {
                return Err(invalid(format!("path references unknown variable '{var}'")));
            }
        }

        for key in &self.primary_keys {
            if !self.schema.contains(key) {
                return Err(invalid(format!(
                    "primary key '{key}' does not resolve in the record schema"
                )));
            }
        }

        if self.replication.mode == ReplicationMode::Incremental {
            let Some(key) = &self.replication.key else {
                return Err(invalid(
                    "incremental replication requires a replication key".to_string(),
                ));
            };
            let Some(field) = self.schema.resolve(key) else {
                return Err(invalid(format!(
                    "replication key '{key}' does not resolve in the record schema"
                )));
            };
            if !field.field_type.is_orderable() {
                return Err(invalid(format!(
                    "replication key '{key}' must be an orderable type, got {}",
                    field.field_type
                )));
            }
        }

        Ok(StreamDefinition {
            name: self.name,
            fields: self.fields,
            path: self.path,
            record_path: self.record_path,
            schema: self.schema,
            primary_keys: self.primary_keys,
            replication: self.replication,
            filter_entity: self.filter_entity,
        })
    }
}
