//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::ConnectorConfig;
use crate::engine::{Message, SyncConfig, SyncEngine};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::output::{arrow_to_json, output_file_name, write_batches_to_parquet};
use crate::state::StateManager;
use crate::stream::{registry, Catalog, StreamDefinition};
use arrow::record_batch::RecordBatch;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check { config_json } => self.check(config_json.as_deref()).await,
            Commands::Discover => self.discover(),
            Commands::Read {
                streams,
                config_json,
                output,
                max_records,
                keep_going,
            } => {
                self.read(
                    streams.as_deref(),
                    config_json.as_deref(),
                    output.as_deref(),
                    *max_records,
                    *keep_going,
                )
                .await
            }
            Commands::Streams => self.streams(),
        }
    }

    /// Load configuration
    fn load_config(&self, inline: Option<&str>) -> Result<ConnectorConfig> {
        // Inline config takes precedence
        if let Some(json_str) = inline {
            return ConnectorConfig::from_json(json_str);
        }

        let path = self.cli.config.as_ref().ok_or_else(|| {
            Error::config("Config not specified (use --config or --config-json)")
        })?;
        ConnectorConfig::from_file(path)
    }

    /// Load state
    fn load_state(&self) -> Result<StateManager> {
        // Inline state takes precedence
        if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)
        } else {
            Ok(StateManager::in_memory())
        }
    }

    /// Check account access
    ///
    /// One request per configured account; a token that reads
    /// `act_<id>` can read the account's edges too.
    async fn check(&self, config_json: Option<&str>) -> Result<()> {
        let config = self.load_config(config_json)?;
        let client = HttpClient::from_connector(&config);

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!("Checking access to {} ad account(s)", config.account_ids.len())
            }
        }));

        let mut failures: Vec<String> = Vec::new();
        for account_id in &config.account_ids {
            let request = RequestConfig::new().query("fields", "account_id");
            if let Err(e) = client
                .get_with_config(&format!("/act_{account_id}"), request)
                .await
            {
                failures.push(format!("act_{account_id}: {e}"));
            }
        }

        if failures.is_empty() {
            self.output_message(&json!({
                "type": "CONNECTION_STATUS",
                "connectionStatus": {
                    "status": "SUCCEEDED",
                    "message": format!("Verified access to {} ad account(s)", config.account_ids.len())
                }
            }));
        } else {
            self.output_message(&json!({
                "type": "CONNECTION_STATUS",
                "connectionStatus": {
                    "status": "FAILED",
                    "message": format!("Connection failed: {}", failures.join("; "))
                }
            }));
        }

        Ok(())
    }

    /// Print the stream catalog
    fn discover(&self) -> Result<()> {
        let definitions = registry::all()?;
        let catalog = Catalog::from_definitions(&definitions);

        self.output_message(&json!({
            "type": "CATALOG",
            "catalog": catalog.to_json()
        }));

        Ok(())
    }

    /// List stream names
    fn streams(&self) -> Result<()> {
        self.output_message(&json!({
            "type": "STREAMS",
            "streams": registry::STREAM_NAMES
        }));

        Ok(())
    }

    /// Read data
    async fn read(
        &self,
        streams: Option<&str>,
        config_json: Option<&str>,
        output: Option<&Path>,
        max_records: Option<usize>,
        keep_going: bool,
    ) -> Result<()> {
        let config = self.load_config(config_json)?;
        let state = self.load_state()?;
        let definitions = Self::select_streams(streams)?;

        if matches!(self.cli.format, OutputFormat::Parquet) && output.is_none() {
            return Err(Error::config("Parquet format requires --output directory"));
        }
        if let Some(dir) = output {
            std::fs::create_dir_all(dir).map_err(|e| {
                Error::output(format!("Failed to create '{}': {e}", dir.display()))
            })?;
        }

        let client = HttpClient::from_connector(&config);
        let mut sync_config = SyncConfig::new().with_fail_fast(!keep_going);
        if let Some(max) = max_records {
            sync_config = sync_config.with_max_records(max);
        }

        let mut engine = SyncEngine::new(client, state).with_config(sync_config);
        let messages = engine.sync_streams(&definitions, &config).await?;

        // Batches grouped per stream/account so each lands in one file
        let mut parquet_batches: BTreeMap<(String, String), Vec<RecordBatch>> = BTreeMap::new();

        for message in &messages {
            self.output_engine_message(message)?;
            if let Message::Record {
                stream,
                account_id,
                batch,
            } = message
            {
                if output.is_some() {
                    parquet_batches
                        .entry((stream.clone(), account_id.clone()))
                        .or_default()
                        .push(batch.clone());
                }
            }
        }

        let mut output_files: Vec<String> = Vec::new();
        if let Some(dir) = output {
            for ((stream, account_id), batches) in &parquet_batches {
                let path = dir.join(output_file_name(stream, account_id));
                write_batches_to_parquet(&path, batches, None)?;
                output_files.push(path.display().to_string());
            }
        }

        // Final state snapshot so the caller can capture it even when no
        // checkpoint fired during the run
        let final_state = engine.state().to_value().await?;
        self.output_message(&json!({
            "type": "STATE",
            "state": final_state
        }));

        let stats = engine.stats();
        self.output_message(&json!({
            "type": "SYNC_SUMMARY",
            "summary": {
                "status": if stats.errors == 0 { "SUCCEEDED" } else if stats.records_synced > 0 { "PARTIAL" } else { "FAILED" },
                "records_synced": stats.records_synced,
                "records_rejected": stats.records_rejected,
                "pages_fetched": stats.pages_fetched,
                "streams_synced": stats.streams_synced,
                "accounts_synced": stats.accounts_synced,
                "errors": stats.errors,
                "duration_ms": stats.duration_ms,
                "output": {
                    "format": match self.cli.format {
                        OutputFormat::Json => "json",
                        OutputFormat::Pretty => "pretty",
                        OutputFormat::Parquet => "parquet",
                    },
                    "files": output_files
                }
            }
        }));

        Ok(())
    }

    /// Resolve the stream filter against the registry
    fn select_streams(filter: Option<&str>) -> Result<Vec<StreamDefinition>> {
        match filter {
            Some(names) => names
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(registry::find)
                .collect(),
            None => registry::all(),
        }
    }

    /// Print one top-level message in the selected format
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json | OutputFormat::Parquet => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }

    /// Output an engine message
    fn output_engine_message(&self, msg: &Message) -> Result<()> {
        match msg {
            Message::Schema {
                stream,
                schema,
                key_properties,
            } => {
                self.output_message(&json!({
                    "type": "SCHEMA",
                    "stream": stream,
                    "schema": schema,
                    "key_properties": key_properties
                }));
            }
            Message::Record {
                stream,
                account_id,
                batch,
            } => {
                // Parquet format keeps records out of stdout
                if matches!(self.cli.format, OutputFormat::Parquet) {
                    return Ok(());
                }

                let records = arrow_to_json(batch)?;
                let emitted_at = chrono::Utc::now().timestamp_millis();
                for record in records {
                    self.output_message(&json!({
                        "type": "RECORD",
                        "record": {
                            "stream": stream,
                            "account_id": account_id,
                            "data": record,
                            "emitted_at": emitted_at
                        }
                    }));
                }
            }
            Message::State { value } => {
                self.output_message(&json!({
                    "type": "STATE",
                    "state": value
                }));
            }
            Message::Log { level, message } => {
                self.output_message(&json!({
                    "type": "LOG",
                    "log": {
                        "level": level,
                        "message": message
                    }
                }));
            }
        }
        Ok(())
    }
}
