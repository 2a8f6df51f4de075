//! Stream definition module
//!
//! Immutable, validated declarations of the Marketing API streams this
//! connector extracts.
//!
//! # Features
//!
//! - **Declarative Definitions**: Fields, path template, schema, keys
//! - **Construction-Time Validation**: Bad declarations never reach the engine
//! - **Built-in Registry**: The ad-account edges this connector knows
//! - **Catalog Rendering**: Discover output for downstream tooling

mod catalog;
mod definition;
pub mod registry;

pub use catalog::{Catalog, CatalogEntry};
pub use definition::{Replication, ReplicationConfig, StreamDefinition, StreamDefinitionBuilder};
