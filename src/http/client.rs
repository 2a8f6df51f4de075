//! HTTP client for the Graph API
//!
//! Wraps reqwest with retry, backoff and rate limiting. Non-success
//! responses are decoded into the Graph error envelope before deciding
//! whether to retry, because Graph reports throttling with HTTP 400/403
//! and a transient error code in the body rather than a 429.

use crate::auth::Authenticator;
use crate::config::ConnectorConfig;
use crate::error::{Error, Result};
use crate::http::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::types::BackoffType;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

// ============================================================================
// Client Configuration
// ============================================================================

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL prepended to relative request paths
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Maximum number of retries per request
    pub max_retries: u32,
    /// HTTP status codes that trigger a retry
    pub retry_statuses: Vec<u16>,
    /// Backoff strategy between retries
    pub backoff_type: BackoffType,
    /// Initial backoff delay
    pub initial_backoff: Duration,
    /// Maximum backoff delay
    pub max_backoff: Duration,
    /// Multiplier applied per attempt for exponential backoff
    pub backoff_multiplier: f64,
    /// Rate limiter settings, None disables rate limiting
    pub rate_limit: Option<RateLimiterConfig>,
    /// Headers sent with every request
    pub default_headers: HashMap<String, String>,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 5,
            retry_statuses: vec![429, 500, 502, 503, 504],
            backoff_type: BackoffType::Exponential,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            rate_limit: Some(RateLimiterConfig::default()),
            default_headers: HashMap::new(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }

    /// Derive client settings from the connector configuration
    pub fn from_connector(config: &ConnectorConfig) -> Self {
        let http = &config.http;
        Self {
            base_url: Some(config.base_url()),
            timeout: Duration::from_secs(http.timeout_seconds),
            connect_timeout: Duration::from_secs(http.connect_timeout_seconds),
            max_retries: http.max_retries,
            retry_statuses: http.retry_statuses.clone(),
            backoff_type: http.retry_backoff.backoff_type,
            initial_backoff: Duration::from_millis(http.retry_backoff.initial_ms),
            max_backoff: Duration::from_millis(http.retry_backoff.max_ms),
            backoff_multiplier: http.retry_backoff.multiplier,
            rate_limit: http.rate_limit_rps.map(RateLimiterConfig::per_second),
            default_headers: HashMap::new(),
            user_agent: http
                .user_agent
                .clone()
                .unwrap_or_else(default_user_agent),
        }
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Builder for `HttpClientConfig`
#[derive(Debug, Default)]
pub struct HttpClientConfigBuilder {
    config: Option<HttpClientConfig>,
}

impl HttpClientConfigBuilder {
    fn config(&mut self) -> &mut HttpClientConfig {
        self.config.get_or_insert_with(HttpClientConfig::default)
    }

    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config().base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config().timeout = timeout;
        self
    }

    /// Set the maximum number of retries
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config().max_retries = retries;
        self
    }

    /// Set the backoff strategy
    #[must_use]
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        let config = self.config();
        config.backoff_type = backoff_type;
        config.initial_backoff = initial;
        config.max_backoff = max;
        self
    }

    /// Set the rate limiter configuration
    #[must_use]
    pub fn rate_limit(mut self, rate_limit: RateLimiterConfig) -> Self {
        self.config().rate_limit = Some(rate_limit);
        self
    }

    /// Disable rate limiting
    #[must_use]
    pub fn no_rate_limit(mut self) -> Self {
        self.config().rate_limit = None;
        self
    }

    /// Add a default header sent with every request
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config().default_headers.insert(key.into(), value.into());
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config().user_agent = user_agent.into();
        self
    }

    /// Build the final configuration
    pub fn build(mut self) -> HttpClientConfig {
        self.config.take().unwrap_or_default()
    }
}

// ============================================================================
// Request Configuration
// ============================================================================

/// Per-request options layered over the client defaults
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters
    pub query: HashMap<String, String>,
    /// Additional headers for this request
    pub headers: HashMap<String, String>,
    /// Override the client timeout for this request
    pub timeout: Option<Duration>,
    /// Override the client retry count for this request
    pub max_retries: Option<u32>,
}

impl RequestConfig {
    /// Create an empty request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Override the timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the retry count
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }
}

// ============================================================================
// Graph Error Envelope
// ============================================================================

/// Error envelope returned by Graph on failed requests
#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    code: i64,
    error_subcode: Option<i64>,
    fbtrace_id: Option<String>,
}

impl GraphErrorEnvelope {
    fn into_error(self) -> Error {
        Error::GraphApi {
            code: self.error.code,
            subcode: self.error.error_subcode,
            error_type: self
                .error
                .error_type
                .unwrap_or_else(|| "GraphError".to_string()),
            message: self.error.message,
            fbtrace_id: self.error.fbtrace_id,
        }
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client with retry, backoff and rate limiting
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Option<Authenticator>,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a client with default configuration
    pub fn new() -> Self {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a client with the given configuration
    pub fn with_config(config: HttpClientConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .expect("Failed to build HTTP client");

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Self {
            client,
            config,
            authenticator: None,
            rate_limiter,
        }
    }

    /// Create an authenticated client from the connector configuration
    pub fn from_connector(config: &ConnectorConfig) -> Self {
        Self::with_config(HttpClientConfig::from_connector(config))
            .with_auth(Authenticator::access_token(&config.access_token))
    }

    /// Attach an authenticator
    #[must_use]
    pub fn with_auth(mut self, authenticator: Authenticator) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Whether a rate limiter is active
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Send a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        self.request(Method::GET, path, RequestConfig::new()).await
    }

    /// Send a GET request with per-request options
    pub async fn get_with_config(&self, path: &str, config: RequestConfig) -> Result<Response> {
        self.request(Method::GET, path, config).await
    }

    /// Send a GET request and deserialize the JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_json_with_config(path, RequestConfig::new()).await
    }

    /// Send a GET request with options and deserialize the JSON response
    pub async fn get_json_with_config<T: DeserializeOwned>(
        &self,
        path: &str,
        config: RequestConfig,
    ) -> Result<T> {
        let response = self.request(Method::GET, path, config).await?;
        Ok(response.json::<T>().await?)
    }

    /// Send a request with retries, backoff and rate limiting
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        request_config: RequestConfig,
    ) -> Result<Response> {
        let url = self.build_url(path);
        let max_retries = request_config.max_retries.unwrap_or(self.config.max_retries);
        let mut last_error: Option<Error> = None;

        for attempt in 0..=max_retries {
            if let Some(limiter) = &self.rate_limiter {
                limiter.wait().await;
            }

            let mut req = self.client.request(method.clone(), &url);

            for (key, value) in &self.config.default_headers {
                req = req.header(key, value);
            }
            for (key, value) in &request_config.headers {
                req = req.header(key, value);
            }
            if !request_config.query.is_empty() {
                req = req.query(&request_config.query);
            }
            if let Some(timeout) = request_config.timeout {
                req = req.timeout(timeout);
            }
            if let Some(auth) = &self.authenticator {
                req = auth.apply(req);
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        debug!(%url, status = status.as_u16(), attempt, "Request succeeded");
                        return Ok(response);
                    }

                    let error = self.error_for_response(response).await;
                    if attempt == max_retries || !self.should_retry(&error) {
                        return Err(error);
                    }

                    let delay = self.retry_delay(&error, attempt);
                    warn!(
                        %url,
                        status = status.as_u16(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying failed request: {error}"
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(error);
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < max_retries => {
                    let delay = self.calculate_backoff(attempt);
                    warn!(
                        %url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transport error, retrying: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(Error::Http(e));
                }
                Err(e) => return Err(Error::Http(e)),
            }
        }

        Err(last_error.unwrap_or(Error::MaxRetriesExceeded { max_retries }))
    }

    /// Turn a non-success response into the most specific error available
    async fn error_for_response(&self, response: Response) -> Error {
        let status = response.status();
        let retry_after = extract_retry_after(&response);
        let body = response.text().await.unwrap_or_default();

        if let Ok(envelope) = serde_json::from_str::<GraphErrorEnvelope>(&body) {
            return envelope.into_error();
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Error::RateLimited {
                retry_after_seconds: retry_after.unwrap_or(60),
            };
        }
        Error::http_status(status.as_u16(), body)
    }

    fn should_retry(&self, error: &Error) -> bool {
        match error {
            Error::HttpStatus { status, .. } => self.config.retry_statuses.contains(status),
            _ => error.is_retryable(),
        }
    }

    fn retry_delay(&self, error: &Error, attempt: u32) -> Duration {
        match error {
            Error::RateLimited {
                retry_after_seconds,
            } => Duration::from_secs(*retry_after_seconds),
            _ => self.calculate_backoff(attempt),
        }
    }

    /// Compute the backoff delay for a retry attempt
    pub(crate) fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff * (attempt + 1),
            BackoffType::Exponential => {
                let factor = self.config.backoff_multiplier.max(1.0).powi(attempt as i32);
                let secs = self.config.initial_backoff.as_secs_f64() * factor;
                if secs.is_finite() && secs < self.config.max_backoff.as_secs_f64() {
                    Duration::from_secs_f64(secs)
                } else {
                    self.config.max_backoff
                }
            }
        };
        backoff.min(self.config.max_backoff)
    }

    /// Resolve a path against the base URL
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        match &self.config.base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/')),
            None => path.to_string(),
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_auth", &self.authenticator.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish()
    }
}

/// Read the retry-after header as whole seconds
fn extract_retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}
