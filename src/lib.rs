// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # fbads-sync
//!
//! A Rust-native extraction connector for the Facebook Marketing API.
//! Pulls ad rules, campaigns, and ad labels from one or more ad accounts
//! into Arrow record batches, with incremental sync driven by persisted
//! bookmarks.
//!
//! ## Features
//!
//! - **Graph API Extraction**: Versioned REST endpoints with declared field lists
//! - **Cursor Pagination**: Follows `paging.cursors.after` until exhausted
//! - **Incremental Sync**: Server-side `filtering` predicates from stored bookmarks
//! - **Typed Records**: Declared schemas with coercion and primary-key checks
//! - **Arrow Output**: Native Arrow RecordBatch output, with optional Parquet files
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fbads_sync::http::HttpClient;
//! use fbads_sync::state::StateManager;
//! use fbads_sync::stream::registry;
//! use fbads_sync::{ConnectorConfig, Result, SyncEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Load config with access token and account ids
//!     let config = ConnectorConfig::from_file("config.json")?;
//!
//!     // Sync every registered stream for every account
//!     let client = HttpClient::from_connector(&config);
//!     let mut engine = SyncEngine::new(client, StateManager::in_memory());
//!     let streams = registry::all()?;
//!     let messages = engine.sync_streams(&streams, &config).await?;
//!
//!     for message in messages {
//!         // Process SCHEMA, RECORD, STATE, and LOG messages
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Sync Engine                              │
//! │  check() → Status    discover() → Catalog                       │
//! │  sync_streams(definitions, config) → Vec<Message>               │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   Auth   │   HTTP    │   Paginate    │   State   │   Output    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Token    │ GET       │ Graph Cursor  │ Bookmarks │ Arrow       │
//! │ Query    │ Retry     │ after param   │ JSON file │ Parquet     │
//! │ Param    │ Rate Limit│ paging.next   │ Atomic    │             │
//! │          │ Backoff   │               │ writes    │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: Add docs before 1.0 release

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the connector
pub mod error;

/// Common types and type aliases
pub mod types;

/// Access token authentication
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Graph API cursor pagination
pub mod pagination;

/// Response decoding and record extraction
pub mod decode;

/// State management and bookmark checkpointing
pub mod state;

/// Arrow/Parquet output
pub mod output;

/// Main sync engine
pub mod engine;

/// Connector configuration
pub mod config;

/// Stream definitions and registry
pub mod stream;

/// Template interpolation
pub mod template;

/// Command-line interface
pub mod cli;

/// Declared record schemas and coercion
pub mod schema;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::ConnectorConfig;
pub use engine::{Message, SyncEngine};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
