//! Authenticator implementation
//!
//! The Marketing API authenticates with a ready-made access token,
//! carried either as the `access_token` query parameter (the Graph
//! default) or as a bearer header.

use reqwest::RequestBuilder;

/// Where the access token travels on each request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    /// `access_token` query parameter
    #[default]
    Query,
    /// `Authorization: Bearer` header
    Header,
}

/// Applies the access token to outgoing requests
#[derive(Clone)]
pub struct Authenticator {
    token: String,
    location: Location,
}

impl Authenticator {
    /// Token in the `access_token` query parameter
    pub fn access_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            location: Location::Query,
        }
    }

    /// Token in the `Authorization: Bearer` header
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            location: Location::Header,
        }
    }

    /// Where the token is placed
    pub fn location(&self) -> Location {
        self.location
    }

    /// Apply authentication to a request builder
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        match self.location {
            Location::Query => req.query(&[("access_token", self.token.as_str())]),
            Location::Header => req.bearer_auth(&self.token),
        }
    }
}

// Tokens must never end up in logs
impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("token", &"***")
            .field("location", &self.location)
            .finish()
    }
}
