//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs. A
//! bookmark is the highest replication key value seen for one ad account
//! within one stream; the next run only asks Graph for rows past it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete state for a connector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    /// Per-stream state
    #[serde(default)]
    pub streams: BTreeMap<String, StreamState>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a stream
    pub fn get_stream(&self, stream: &str) -> Option<&StreamState> {
        self.streams.get(stream)
    }

    /// Get mutable state for a stream, creating if needed
    pub fn get_stream_mut(&mut self, stream: &str) -> &mut StreamState {
        self.streams.entry(stream.to_string()).or_default()
    }

    /// Get the bookmark for a stream and account
    pub fn get_bookmark(&self, stream: &str, account_id: &str) -> Option<&str> {
        self.streams
            .get(stream)?
            .accounts
            .get(account_id)?
            .bookmark
            .as_deref()
    }

    /// Set the bookmark for a stream and account
    pub fn set_bookmark(&mut self, stream: &str, account_id: &str, bookmark: String) {
        self.get_stream_mut(stream)
            .get_account_mut(account_id)
            .bookmark = Some(bookmark);
    }
}

/// State for a single stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamState {
    /// Per-account bookmark state
    #[serde(default)]
    pub accounts: BTreeMap<String, AccountState>,
}

impl StreamState {
    /// Create a new empty stream state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for an account
    pub fn get_account(&self, account_id: &str) -> Option<&AccountState> {
        self.accounts.get(account_id)
    }

    /// Get mutable state for an account, creating if needed
    pub fn get_account_mut(&mut self, account_id: &str) -> &mut AccountState {
        self.accounts.entry(account_id.to_string()).or_default()
    }
}

/// Bookmark state for one ad account within a stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountState {
    /// Highest replication key value from the last completed sync
    #[serde(default)]
    pub bookmark: Option<String>,
}

impl AccountState {
    /// Create a new empty account state
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_state_default() {
        let state = State::new();
        assert!(state.streams.is_empty());
    }

    #[test]
    fn test_state_bookmark() {
        let mut state = State::new();
        assert!(state.get_bookmark("adrules_library", "120218956").is_none());

        state.set_bookmark(
            "adrules_library",
            "120218956",
            "2024-05-21T07:24:30+0000".to_string(),
        );
        assert_eq!(
            state.get_bookmark("adrules_library", "120218956"),
            Some("2024-05-21T07:24:30+0000")
        );

        // Other accounts and streams stay untouched
        assert!(state.get_bookmark("adrules_library", "999").is_none());
        assert!(state.get_bookmark("campaigns", "120218956").is_none());
    }

    #[test]
    fn test_state_serialization_shape() {
        let mut state = State::new();
        state.set_bookmark("adrules_library", "1", "2024-01-01T00:00:00+0000".to_string());

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "streams": {
                    "adrules_library": {
                        "accounts": {
                            "1": {"bookmark": "2024-01-01T00:00:00+0000"}
                        }
                    }
                }
            })
        );

        let restored: State = serde_json::from_value(json).unwrap();
        assert_eq!(
            restored.get_bookmark("adrules_library", "1"),
            Some("2024-01-01T00:00:00+0000")
        );
    }
}
