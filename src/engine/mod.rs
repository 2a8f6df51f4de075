//! Execution engine module
//!
//! Main read loop and stream orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - Drives stream definitions against the Graph API
//! - `SyncConfig` - Configuration for sync operations
//! - Message types for output (Schema, Record, State, Log)

mod types;

pub use types::{Message, SyncConfig, SyncStats};

use crate::config::ConnectorConfig;
use crate::decode::RecordExtractor;
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::output::json_to_arrow;
use crate::pagination::{GraphCursorPaginator, NextPage, PaginationState, Paginator};
use crate::schema::{coerce_record, resolve_value};
use crate::state::StateManager;
use crate::stream::StreamDefinition;
use crate::template::RequestContext;
use crate::types::MissingKeyPolicy;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Sync engine for orchestrating data extraction
pub struct SyncEngine {
    /// HTTP client
    client: HttpClient,
    /// State manager
    state: StateManager,
    /// Sync configuration
    config: SyncConfig,
    /// Statistics
    stats: SyncStats,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(client: HttpClient, state: StateManager) -> Self {
        Self {
            client,
            state,
            config: SyncConfig::default(),
            stats: SyncStats::default(),
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.stats = SyncStats::default();
    }

    /// Sync every definition for every configured account
    ///
    /// The schema declaration for each stream is emitted before any of its
    /// records. Streams are synced sequentially, accounts within a stream
    /// too; definitions are shared read-only.
    pub async fn sync_streams(
        &mut self,
        definitions: &[StreamDefinition],
        config: &ConnectorConfig,
    ) -> Result<Vec<Message>> {
        let start = Instant::now();
        let mut messages = Vec::new();

        for definition in definitions {
            messages.push(Message::schema(
                definition.name(),
                definition.json_schema(),
                definition.primary_keys().to_vec(),
            ));

            for account_id in &config.account_ids {
                match self.sync_stream(definition, config, account_id).await {
                    Ok(msgs) => {
                        messages.extend(msgs);
                        self.stats.add_account();
                    }
                    Err(e) => {
                        self.stats.add_error();
                        warn!(
                            stream = definition.name(),
                            account_id, "Stream sync failed: {e}"
                        );
                        messages.push(Message::error(format!(
                            "Stream '{}' failed for account {account_id}: {e}",
                            definition.name()
                        )));
                        if self.config.fail_fast {
                            return Err(e);
                        }
                    }
                }
            }
            self.stats.add_stream();
        }

        #[allow(clippy::cast_possible_truncation)]
        self.stats.set_duration(start.elapsed().as_millis() as u64);

        Ok(messages)
    }

    /// Sync a single stream for a single ad account
    pub async fn sync_stream(
        &mut self,
        definition: &StreamDefinition,
        config: &ConnectorConfig,
        account_id: &str,
    ) -> Result<Vec<Message>> {
        let stream = definition.name();
        let mut messages = Vec::new();

        info!(stream, account_id, "Starting sync");
        messages.push(Message::info(format!(
            "Syncing stream '{stream}' for account {account_id}"
        )));

        let ctx = RequestContext::for_account(config.to_value(), account_id);
        let path = definition.resource_path(&ctx)?;

        let extractor = RecordExtractor::with_path(definition.record_path());
        let paginator = GraphCursorPaginator::new();
        let mut pagination_state = PaginationState::new();

        // Incremental streams resume from the stored bookmark, falling back
        // to the configured start date on the first run
        let bookmark = if definition.is_incremental() {
            match self.state.get_bookmark(stream, account_id).await {
                Some(stored) => Some(stored),
                None => config.start_date(),
            }
        } else {
            None
        };

        let mut base_params: HashMap<String, String> = HashMap::new();
        base_params.insert("limit".to_string(), config.page_size.to_string());
        if let Some(bookmark) = &bookmark {
            base_params.insert("filtering".to_string(), build_filter(definition, bookmark)?);
        }

        let mut params = base_params.clone();
        params.extend(paginator.initial_params(&pagination_state));

        let mut batch_buffer: Vec<Value> = Vec::new();
        let mut max_replication: Option<String> = None;
        let mut emitted = 0usize;
        let mut truncated = false;

        loop {
            let mut req = RequestConfig::new();
            for (key, value) in &params {
                req = req.query(key, value);
            }

            let response = self.client.get_with_config(&path, req).await?;
            let body: Value = response.json().await?;
            self.stats.add_page();

            let raw_records = extractor.extract(&body)?;
            let page_count = raw_records.len();
            debug!(
                stream,
                account_id,
                page = pagination_state.pages + 1,
                records = page_count,
                "Fetched page"
            );

            for raw in raw_records {
                match self.process_record(definition, &raw, &mut max_replication) {
                    Ok(record) => {
                        batch_buffer.push(record);
                        emitted += 1;
                        self.stats.add_records(1);
                    }
                    Err(e) if e.is_record_error() => {
                        self.stats.add_rejected();
                        warn!(stream, account_id, "Skipping record: {e}");
                        messages.push(Message::warn(format!("Skipping record: {e}")));
                    }
                    Err(e) => return Err(e),
                }

                if self.config.max_records > 0 && emitted >= self.config.max_records {
                    truncated = true;
                    break;
                }
            }

            while self.config.batch_size > 0 && batch_buffer.len() >= self.config.batch_size {
                let chunk: Vec<Value> = batch_buffer.drain(..self.config.batch_size).collect();
                let batch = json_to_arrow(&chunk, definition.record_schema())?;
                messages.push(Message::record(stream, account_id, batch));
            }

            if truncated {
                messages.push(Message::info(format!(
                    "Record limit reached for '{stream}', truncating run"
                )));
                break;
            }

            match paginator.process_response(&body, page_count, &mut pagination_state) {
                NextPage::Continue { query_params } => {
                    params = base_params.clone();
                    params.extend(query_params);
                }
                NextPage::Done => break,
            }
        }

        if !batch_buffer.is_empty() {
            let batch = json_to_arrow(&batch_buffer, definition.record_schema())?;
            messages.push(Message::record(stream, account_id, batch));
        }

        // The bookmark only advances once the final page is in; a truncated
        // run keeps the old bookmark so skipped records are not lost
        if definition.is_incremental() && !truncated {
            if let Some(new_bookmark) = &max_replication {
                let advanced = bookmark
                    .as_deref()
                    .is_none_or(|old| bookmark_exceeds(new_bookmark, old));
                if advanced {
                    self.state
                        .set_bookmark(stream, account_id, new_bookmark.clone())
                        .await?;
                    messages.push(Message::state(self.state.to_value().await?));
                }
            }
        }

        info!(
            stream,
            account_id,
            records = emitted,
            pages = pagination_state.pages,
            "Completed sync"
        );
        messages.push(Message::info(format!(
            "Completed '{stream}' for account {account_id}: {emitted} records in {} pages",
            pagination_state.pages
        )));

        Ok(messages)
    }

    /// Run one record through coercion and key checks
    ///
    /// Record-level failures come back as errors marked recoverable; the
    /// caller skips the record and keeps the stream alive.
    fn process_record(
        &self,
        definition: &StreamDefinition,
        raw: &Value,
        max_replication: &mut Option<String>,
    ) -> Result<Value> {
        let record = coerce_record(definition.record_schema(), raw)?;

        for pk in definition.primary_keys() {
            match resolve_value(&record, pk) {
                Some(value) if !value.is_null() => {}
                _ => return Err(Error::missing_primary_key(pk)),
            }
        }

        if let Some(key) = definition.replication_key() {
            match resolve_value(&record, key) {
                Some(value) if !value.is_null() => {
                    if let Some(candidate) = bookmark_value(value) {
                        let exceeds = max_replication
                            .as_deref()
                            .is_none_or(|current| bookmark_exceeds(&candidate, current));
                        if exceeds {
                            *max_replication = Some(candidate);
                        }
                    }
                }
                _ => match self.config.missing_replication_key {
                    MissingKeyPolicy::Emit => {
                        debug!(
                            stream = definition.name(),
                            "Record lacks replication key '{key}', emitting without bookmark"
                        );
                    }
                    MissingKeyPolicy::Drop => {
                        return Err(Error::missing_replication_key(key));
                    }
                },
            }
        }

        Ok(record)
    }
}

/// Render the Graph `filtering` parameter for an incremental request
///
/// Graph expects epoch seconds in the comparison value, while bookmarks
/// are stored in the upstream's own timestamp format.
fn build_filter(definition: &StreamDefinition, bookmark: &str) -> Result<String> {
    let key = definition
        .replication_key()
        .ok_or_else(|| Error::state("Incremental sync requires a replication key"))?;

    let epoch = if let Ok(epoch) = bookmark.parse::<i64>() {
        epoch
    } else {
        crate::types::parse_timestamp(bookmark)
            .ok_or_else(|| Error::state(format!("Bookmark '{bookmark}' is not a valid timestamp")))?
            .timestamp()
    };

    let filter = serde_json::json!([{
        "field": format!("{}.{key}", definition.filter_entity()),
        "operator": "GREATER_THAN",
        "value": epoch,
    }]);
    Ok(filter.to_string())
}

/// Render a replication key value as a bookmark string
fn bookmark_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Compare bookmark strings: numerically when both are numbers, else
/// lexicographically (ISO-8601 timestamps order correctly as text)
fn bookmark_exceeds(candidate: &str, current: &str) -> bool {
    if let (Ok(a), Ok(b)) = (candidate.parse::<f64>(), current.parse::<f64>()) {
        return a > b;
    }
    candidate > current
}
