//! Connector configuration
//!
//! Runtime settings loaded from a JSON or YAML file: credentials, the
//! accounts to sync, API version pinning, and HTTP tuning. Stream
//! declarations are compiled in (see [`crate::stream::registry`]); the
//! config only decides how to reach the API.

use crate::error::{Error, Result};
use crate::types::{parse_timestamp, BackoffType, OptionStringExt};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Top-Level Connector Config
// ============================================================================

/// Complete connector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Marketing API access token (long-lived system-user tokens work best)
    pub access_token: String,

    /// Ad account ids to sync, numeric, without the `act_` prefix
    pub account_ids: Vec<String>,

    /// Graph API host
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Graph API version the requests are pinned to
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Floor for incremental extraction when no bookmark exists yet
    #[serde(default)]
    pub start_date: Option<String>,

    /// Records requested per page (the `limit` parameter)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_api_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_api_version() -> String {
    "v21.0".to_string()
}

fn default_page_size() -> u32 {
    100
}

impl ConnectorConfig {
    /// Load from a JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON string
    pub fn from_json(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML string
    pub fn from_yaml(s: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, picking the format from the extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!("Failed to read config '{}': {}", path.display(), e))
            }
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Validate the loaded configuration
    pub fn validate(&self) -> Result<()> {
        if self.access_token.is_empty() {
            return Err(Error::missing_field("access_token"));
        }
        if self.account_ids.is_empty() {
            return Err(Error::missing_field("account_ids"));
        }
        for id in &self.account_ids {
            if id.is_empty() {
                return Err(Error::InvalidConfigValue {
                    field: "account_ids".to_string(),
                    message: "account id must not be empty".to_string(),
                });
            }
            if id.starts_with("act_") {
                return Err(Error::InvalidConfigValue {
                    field: "account_ids".to_string(),
                    message: format!("'{id}' carries the act_ prefix; pass the bare numeric id"),
                });
            }
        }
        if let Some(start_date) = self.start_date.clone().none_if_empty() {
            if parse_timestamp(&start_date).is_none() {
                return Err(Error::InvalidConfigValue {
                    field: "start_date".to_string(),
                    message: format!("'{start_date}' is not an ISO 8601 timestamp or date"),
                });
            }
        }
        if self.page_size == 0 {
            return Err(Error::InvalidConfigValue {
                field: "page_size".to_string(),
                message: "page_size must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Version-pinned base URL all resource paths are joined onto
    pub fn base_url(&self) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            self.api_version
        )
    }

    /// Start date normalized: empty strings count as unset
    pub fn start_date(&self) -> Option<String> {
        self.start_date.clone().none_if_empty()
    }

    /// The config as a JSON value, for template contexts
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// HTTP status codes to retry on
    #[serde(default = "default_retry_statuses")]
    pub retry_statuses: Vec<u16>,

    /// Retry backoff configuration
    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Requests per second; unset disables client-side rate limiting
    #[serde(default = "default_rate_limit_rps")]
    pub rate_limit_rps: Option<f64>,

    /// User agent sent with every request
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            max_retries: default_max_retries(),
            retry_statuses: default_retry_statuses(),
            retry_backoff: BackoffConfig::default(),
            rate_limit_rps: default_rate_limit_rps(),
            user_agent: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

fn default_rate_limit_rps() -> Option<f64> {
    Some(10.0)
}

/// Backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,

    /// Multiplier for exponential backoff
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
            multiplier: default_multiplier(),
        }
    }
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    60000
}

fn default_multiplier() -> f64 {
    2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_json() {
        let config = ConnectorConfig::from_json(
            r#"{
                "access_token": "EAAB...",
                "account_ids": ["120218956"]
            }"#,
        )
        .unwrap();

        assert_eq!(config.access_token, "EAAB...");
        assert_eq!(config.account_ids, vec!["120218956"]);
        assert_eq!(config.api_url, "https://graph.facebook.com");
        assert_eq!(config.api_version, "v21.0");
        assert_eq!(config.page_size, 100);
        assert!(config.start_date.is_none());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
access_token: "EAAB..."
account_ids:
  - "120218956"
  - "120218957"
api_version: "v19.0"
start_date: "2024-01-01"
http:
  max_retries: 2
  rate_limit_rps: 5.0
"#;

        let config = ConnectorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.account_ids.len(), 2);
        assert_eq!(config.api_version, "v19.0");
        assert_eq!(config.http.max_retries, 2);
        assert_eq!(config.http.rate_limit_rps, Some(5.0));
        assert_eq!(config.base_url(), "https://graph.facebook.com/v19.0");
    }

    #[test]
    fn test_missing_access_token() {
        let err = ConnectorConfig::from_json(
            r#"{"access_token": "", "account_ids": ["1"]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("access_token"));
    }

    #[test]
    fn test_missing_account_ids() {
        let err =
            ConnectorConfig::from_json(r#"{"access_token": "t", "account_ids": []}"#).unwrap_err();
        assert!(err.to_string().contains("account_ids"));
    }

    #[test]
    fn test_act_prefix_rejected() {
        let err = ConnectorConfig::from_json(
            r#"{"access_token": "t", "account_ids": ["act_120218956"]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("act_ prefix"));
    }

    #[test]
    fn test_invalid_start_date() {
        let err = ConnectorConfig::from_json(
            r#"{"access_token": "t", "account_ids": ["1"], "start_date": "yesterday"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("start_date"));
    }

    #[test]
    fn test_empty_start_date_counts_as_unset() {
        let config = ConnectorConfig::from_json(
            r#"{"access_token": "t", "account_ids": ["1"], "start_date": ""}"#,
        )
        .unwrap();
        assert_eq!(config.start_date(), None);
    }

    #[test]
    fn test_default_http_config() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_statuses, vec![429, 500, 502, 503, 504]);
        assert_eq!(config.rate_limit_rps, Some(10.0));
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let config = ConnectorConfig::from_json(
            r#"{"access_token": "t", "account_ids": ["1"], "api_url": "https://graph.facebook.com/"}"#,
        )
        .unwrap();
        assert_eq!(config.base_url(), "https://graph.facebook.com/v21.0");
    }
}
