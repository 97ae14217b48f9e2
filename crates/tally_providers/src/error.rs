//! Error types for the providers module.

use thiserror::Error;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while configuring providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid estimate config: {0}")]
    InvalidConfig(String),

    #[error("Config parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] tally_schema::SchemaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a handler declined to price a resource.
///
/// A skip is never fatal: the resource is left out of the estimate and the
/// reason is logged as a warning against the resource address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    #[error("{feature} is not supported")]
    UnsupportedFeature { feature: String },

    #[error("cannot find {detail} through {attribute}")]
    MissingReference { attribute: String, detail: String },
}

impl Skip {
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Skip::UnsupportedFeature {
            feature: feature.into(),
        }
    }

    pub fn missing_reference(attribute: impl Into<String>, detail: impl Into<String>) -> Self {
        Skip::MissingReference {
            attribute: attribute.into(),
            detail: detail.into(),
        }
    }
}
