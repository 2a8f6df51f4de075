//! Template interpolation for resource paths
//!
//! Handles `{{ variable }}` interpolation in stream path templates, e.g.
//! `/act_{{ account_id }}/adrules_library?fields={{ fields }}`.
//! Variables resolve from the request context: request-scoped vars first
//! (account id, joined field list), then connector config via `config.*`.

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}").unwrap()
});

/// Context a request is rendered against
///
/// Carries everything a path template may reference. Built once per
/// stream+account sync and shared read-only with the definition.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Connector configuration values
    pub config: Value,
    /// Request-scoped variables (account id, joined field list)
    pub vars: Value,
}

impl RequestContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with config values
    pub fn with_config(config: Value) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Create a context scoped to one ad account
    pub fn for_account(config: Value, account_id: impl Into<String>) -> Self {
        let mut ctx = Self::with_config(config);
        ctx.set_var("account_id", Value::String(account_id.into()));
        ctx
    }

    /// Set a request-scoped variable
    pub fn set_var(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        if !self.vars.is_object() {
            self.vars = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(map) = &mut self.vars {
            map.insert(key.into(), value);
        }
        self
    }

    /// Get a value by path (e.g., "account_id" or "config.api_version")
    pub fn get(&self, path: &str) -> Option<&Value> {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.is_empty() {
            return None;
        }

        // First part determines the root object
        let root = match parts[0] {
            "config" => &self.config,
            "vars" => &self.vars,
            // Bare names resolve against vars first, then config
            _ => {
                if let Some(val) = get_nested_value(&self.vars, &parts) {
                    return Some(val);
                }
                return get_nested_value(&self.config, &parts);
            }
        };

        // Navigate the remaining path
        if parts.len() == 1 {
            Some(root)
        } else {
            get_nested_value(root, &parts[1..])
        }
    }
}

/// Get a nested value from a JSON value by path
fn get_nested_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for part in path {
        match current {
            Value::Object(map) => {
                current = map.get(*part)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Render a template string with the given context
pub fn render(template: &str, ctx: &RequestContext) -> Result<String> {
    let mut result = template.to_string();
    let mut errors = Vec::new();

    for cap in TEMPLATE_REGEX.captures_iter(template) {
        let full_match = cap.get(0).unwrap().as_str();
        let var_path = cap.get(1).unwrap().as_str();

        match ctx.get(var_path) {
            Some(value) => {
                let replacement = value_to_string(value);
                result = result.replace(full_match, &replacement);
            }
            None => {
                errors.push(var_path.to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(result)
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .map(|cap| cap.get(1).unwrap().as_str().to_string())
        .collect()
}

/// Convert a JSON value to a string for template substitution
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        // For complex types, use JSON serialization
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
