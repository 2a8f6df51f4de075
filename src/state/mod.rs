//! State management module
//!
//! Handles bookmark tracking, checkpointing, and resumability. State is
//! persisted between sync runs so incremental streams only request rows
//! updated since the previous run.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - Bookmarks keyed by stream and ad account
//! - `StateManager` - File-based state persistence with atomic writes

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{AccountState, State, StreamState};
