//! Error types for the connector
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for the connector
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Stream Definition Errors
    // ============================================================================
    #[error("Invalid stream definition '{stream}': {message}")]
    InvalidDefinition { stream: String, message: String },

    #[error("Stream '{stream}' not found")]
    StreamNotFound { stream: String },

    // ============================================================================
    // Record Errors (recoverable per record, never abort a stream)
    // ============================================================================
    #[error("Schema mismatch at '{path}': expected {expected}, got {actual}")]
    SchemaMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Record is missing primary key field '{field}'")]
    MissingPrimaryKey { field: String },

    #[error("Record is missing replication key field '{field}'")]
    MissingReplicationKey { field: String },

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Graph API error {code} ({error_type}): {message}")]
    GraphApi {
        code: i64,
        subcode: Option<i64>,
        error_type: String,
        message: String,
        fbtrace_id: Option<String>,
    },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("JSONPath error: {message}")]
    JsonPath { message: String },

    #[error("Failed to extract records from path '{path}': {message}")]
    RecordExtraction { path: String, message: String },

    // ============================================================================
    // Arrow/Parquet Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Output error: {message}")]
    Output { message: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    // ============================================================================
    // Connector Errors
    // ============================================================================
    #[error("Connection check failed: {message}")]
    ConnectionCheck { message: String },

    // ============================================================================
    // Template Errors
    // ============================================================================
    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid-definition error
    pub fn invalid_definition(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create a schema mismatch error for a record field path
    pub fn schema_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::SchemaMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a missing primary key error
    pub fn missing_primary_key(field: impl Into<String>) -> Self {
        Self::MissingPrimaryKey {
            field: field.into(),
        }
    }

    /// Create a missing replication key error
    pub fn missing_replication_key(field: impl Into<String>) -> Self {
        Self::MissingReplicationKey {
            field: field.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a JSONPath error
    pub fn json_path(message: impl Into<String>) -> Self {
        Self::JsonPath {
            message: message.into(),
        }
    }

    /// Create a template error
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            Error::GraphApi { code, .. } => is_transient_graph_code(*code),
            _ => false,
        }
    }

    /// Check if this is a per-record error (skip the record, keep the stream)
    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            Error::SchemaMismatch { .. }
                | Error::MissingPrimaryKey { .. }
                | Error::MissingReplicationKey { .. }
        )
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Check if a Graph API error code is transient
///
/// 1/2 are unknown/temporary service errors, 4/17/32 are app, user and page
/// request throttles, 613 is a custom rate limit. All clear on retry.
fn is_transient_graph_code(code: i64) -> bool {
    matches!(code, 1 | 2 | 4 | 17 | 32 | 613)
}

/// Result type alias for the connector
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("access_token");
        assert_eq!(
            err.to_string(),
            "Missing required config field: access_token"
        );

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::invalid_definition("adrules_library", "fields must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid stream definition 'adrules_library': fields must not be empty"
        );

        let err = Error::schema_mismatch("created_by.id", "string", "array");
        assert_eq!(
            err.to_string(),
            "Schema mismatch at 'created_by.id': expected string, got array"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::RateLimited {
            retry_after_seconds: 60
        }
        .is_retryable());
        assert!(Error::http_status(429, "").is_retryable());
        assert!(Error::http_status(500, "").is_retryable());
        assert!(Error::http_status(503, "").is_retryable());

        assert!(!Error::http_status(400, "").is_retryable());
        assert!(!Error::http_status(401, "").is_retryable());
        assert!(!Error::http_status(404, "").is_retryable());
        assert!(!Error::config("test").is_retryable());
    }

    #[test]
    fn test_graph_api_retryable_codes() {
        let throttled = Error::GraphApi {
            code: 17,
            subcode: None,
            error_type: "OAuthException".to_string(),
            message: "User request limit reached".to_string(),
            fbtrace_id: Some("AbCdEf".to_string()),
        };
        assert!(throttled.is_retryable());

        let expired_token = Error::GraphApi {
            code: 190,
            subcode: Some(463),
            error_type: "OAuthException".to_string(),
            message: "Error validating access token".to_string(),
            fbtrace_id: None,
        };
        assert!(!expired_token.is_retryable());
    }

    #[test]
    fn test_is_record_error() {
        assert!(Error::missing_primary_key("id").is_record_error());
        assert!(Error::missing_replication_key("updated_time").is_record_error());
        assert!(Error::schema_mismatch("id", "string", "object").is_record_error());

        assert!(!Error::invalid_definition("campaigns", "oops").is_record_error());
        assert!(!Error::http_status(500, "").is_record_error());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
