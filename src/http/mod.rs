//! HTTP client module
//!
//! Provides the Graph API HTTP client with retry, rate limiting, and
//! backoff strategies.
//!
//! # Features
//!
//! - **Automatic Retries**: transient failures are retried with backoff,
//!   including throttling errors Graph reports inside a 400 response body
//! - **Rate Limiting**: token bucket rate limiter using governor
//! - **Backoff Strategies**: constant, linear, and exponential backoff
//! - **Authentication**: integration with the auth module

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
