//! Error types for the schema module.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while loading plans and usage files or checking cost components.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid plan in {path}: {message}")]
    InvalidPlan { path: PathBuf, message: String },

    #[error("Unsupported usage file version: {0}")]
    UnsupportedUsageVersion(String),

    #[error("Invalid cost component {component}: {message}")]
    InvalidComponent { component: String, message: String },

    #[error("Invalid attribute filter regex {pattern}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}
