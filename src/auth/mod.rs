//! Authentication module
//!
//! Access-token auth for the Graph API. Tokens are supplied ready-made
//! through the config; there is no refresh flow.

mod authenticator;

pub use authenticator::{Authenticator, Location};
