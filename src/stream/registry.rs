//! Built-in stream definitions
//!
//! Each function declares one Marketing API edge. Definitions go through
//! the validating builder, so a broken declaration surfaces as an
//! `InvalidDefinition` error the moment the registry is loaded, before
//! any request is made.

use super::definition::StreamDefinition;
use crate::error::{Error, Result};
use crate::schema::{FieldSchema, RecordSchema};

/// Names of all built-in streams
pub const STREAM_NAMES: &[&str] = &["adrules_library", "campaigns", "adlabels"];

/// Automated rules of an ad account
///
/// Rules carry nested evaluation and execution specs; records are keyed
/// by `(id, updated_time)` because edits produce a new `updated_time`
/// for the same rule id.
pub fn adrules_library() -> Result<StreamDefinition> {
    let condition = || {
        FieldSchema::object([
            ("field", FieldSchema::string()),
            ("value", FieldSchema::string()),
            ("operator", FieldSchema::string()),
        ])
    };

    StreamDefinition::builder("adrules_library")
        .fields([
            "id",
            "name",
            "account_id",
            "created_by",
            "evaluation_spec",
            "execution_spec",
            "schedule_spec",
            "updated_time",
        ])
        .path("/act_{{ account_id }}/adrules_library?fields={{ fields }}")
        .schema(RecordSchema::new([
            ("id", FieldSchema::string()),
            ("name", FieldSchema::string()),
            ("account_id", FieldSchema::string()),
            (
                "created_by",
                FieldSchema::object([
                    ("id", FieldSchema::string()),
                    ("name", FieldSchema::string()),
                ]),
            ),
            (
                "evaluation_spec",
                FieldSchema::object([
                    ("evaluation_type", FieldSchema::string()),
                    ("filters", FieldSchema::array(condition())),
                ]),
            ),
            (
                "execution_spec",
                FieldSchema::object([
                    ("execution_type", FieldSchema::string()),
                    ("execution_options", FieldSchema::array(condition())),
                ]),
            ),
            (
                "schedule_spec",
                FieldSchema::object([("schedule_type", FieldSchema::string())]),
            ),
            ("updated_time", FieldSchema::datetime()),
        ]))
        .primary_keys(["id", "updated_time"])
        .incremental("updated_time")
        .build()
}

/// Campaigns of an ad account
pub fn campaigns() -> Result<StreamDefinition> {
    StreamDefinition::builder("campaigns")
        .fields([
            "id",
            "name",
            "account_id",
            "objective",
            "status",
            "effective_status",
            "buying_type",
            "daily_budget",
            "lifetime_budget",
            "start_time",
            "stop_time",
            "created_time",
            "updated_time",
        ])
        .path("/act_{{ account_id }}/campaigns?fields={{ fields }}")
        .schema(RecordSchema::new([
            ("id", FieldSchema::string()),
            ("name", FieldSchema::string()),
            ("account_id", FieldSchema::string()),
            ("objective", FieldSchema::string()),
            ("status", FieldSchema::string()),
            ("effective_status", FieldSchema::string()),
            // Budgets arrive as integer strings in the account currency's
            // minor units
            ("buying_type", FieldSchema::string()),
            ("daily_budget", FieldSchema::string()),
            ("lifetime_budget", FieldSchema::string()),
            ("start_time", FieldSchema::datetime()),
            ("stop_time", FieldSchema::datetime()),
            ("created_time", FieldSchema::datetime()),
            ("updated_time", FieldSchema::datetime()),
        ]))
        .primary_keys(["id"])
        .incremental("updated_time")
        // The filtering parameter addresses campaigns as "campaign"
        .filter_entity("campaign")
        .build()
}

/// Ad labels of an ad account
///
/// A small edge; replicated full-table every run because label reuse
/// makes `updated_time` unreliable as a watermark.
pub fn adlabels() -> Result<StreamDefinition> {
    StreamDefinition::builder("adlabels")
        .fields(["id", "name", "created_time", "updated_time"])
        .path("/act_{{ account_id }}/adlabels?fields={{ fields }}")
        .schema(RecordSchema::new([
            ("id", FieldSchema::string()),
            ("name", FieldSchema::string()),
            ("created_time", FieldSchema::datetime()),
            ("updated_time", FieldSchema::datetime()),
        ]))
        .primary_keys(["id"])
        .full_table()
        .build()
}

/// All built-in streams, in catalog order
pub fn all() -> Result<Vec<StreamDefinition>> {
    Ok(vec![adrules_library()?, campaigns()?, adlabels()?])
}

/// Look up a built-in stream by name
pub fn find(name: &str) -> Result<StreamDefinition> {
    match name {
        "adrules_library" => adrules_library(),
        "campaigns" => campaigns(),
        "adlabels" => adlabels(),
        _ => Err(Error::StreamNotFound {
            stream: name.to_string(),
        }),
    }
}
