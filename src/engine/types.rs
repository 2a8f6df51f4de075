//! Engine types
//!
//! Message types and configuration for the sync engine.

use crate::types::{LogLevel, MissingKeyPolicy};
use arrow::record_batch::RecordBatch;
use serde_json::Value;

/// A message emitted during sync
#[derive(Debug, Clone)]
pub enum Message {
    /// Schema declaration, emitted before the first record of a stream
    Schema {
        /// Stream name
        stream: String,
        /// JSON-schema rendering of the declared record schema
        schema: Value,
        /// Primary key fields
        key_properties: Vec<String>,
    },
    /// A batch of records
    Record {
        /// Stream name
        stream: String,
        /// Ad account the records belong to
        account_id: String,
        /// The record batch
        batch: RecordBatch,
    },
    /// State snapshot taken after a checkpoint
    State {
        /// Full connector state
        value: Value,
    },
    /// Log message
    Log {
        /// Log level
        level: LogLevel,
        /// Log message
        message: String,
    },
}

impl Message {
    /// Create a schema message
    pub fn schema(stream: impl Into<String>, schema: Value, key_properties: Vec<String>) -> Self {
        Self::Schema {
            stream: stream.into(),
            schema,
            key_properties,
        }
    }

    /// Create a record message
    pub fn record(
        stream: impl Into<String>,
        account_id: impl Into<String>,
        batch: RecordBatch,
    ) -> Self {
        Self::Record {
            stream: stream.into(),
            account_id: account_id.into(),
            batch,
        }
    }

    /// Create a state message
    pub fn state(value: Value) -> Self {
        Self::State { value }
    }

    /// Create a log message
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
        }
    }

    /// Create an info log
    pub fn info(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Info, message)
    }

    /// Create a debug log
    pub fn debug(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Debug, message)
    }

    /// Create a warning log
    pub fn warn(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Warn, message)
    }

    /// Create an error log
    pub fn error(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Error, message)
    }

    /// Check if this is a schema message
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Check if this is a log message
    pub fn is_log(&self) -> bool {
        matches!(self, Self::Log { .. })
    }
}

/// Configuration for sync operation
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Records per emitted Arrow batch (0 = one batch at end of sync)
    pub batch_size: usize,
    /// Maximum records to sync per stream/account (0 = unlimited)
    pub max_records: usize,
    /// How to treat records lacking the replication key
    pub missing_replication_key: MissingKeyPolicy,
    /// Abort the whole run on the first stream-level failure
    pub fail_fast: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_records: 0,
            missing_replication_key: MissingKeyPolicy::default(),
            fail_fast: true,
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set batch size (0 defers flushing to the end of each stream sync)
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set max records per stream/account
    #[must_use]
    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = max;
        self
    }

    /// Set the missing replication key policy
    #[must_use]
    pub fn with_missing_key_policy(mut self, policy: MissingKeyPolicy) -> Self {
        self.missing_replication_key = policy;
        self
    }

    /// Set fail fast mode
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Records accepted and emitted
    pub records_synced: usize,
    /// Records rejected by the per-record pipeline
    pub records_rejected: usize,
    /// Pages fetched
    pub pages_fetched: usize,
    /// Streams synced
    pub streams_synced: usize,
    /// Stream/account combinations synced
    pub accounts_synced: usize,
    /// Stream-level errors encountered
    pub errors: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add accepted records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Count a rejected record
    pub fn add_rejected(&mut self) {
        self.records_rejected += 1;
    }

    /// Count a fetched page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Count a completed stream
    pub fn add_stream(&mut self) {
        self.streams_synced += 1;
    }

    /// Count a completed stream/account sync
    pub fn add_account(&mut self) {
        self.accounts_synced += 1;
    }

    /// Count a stream-level error
    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
