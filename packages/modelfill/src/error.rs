//! Typed errors for model filling.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. No variant is recovered
//! internally: every failure surfaces to the immediate caller.

use std::path::PathBuf;

use openai_client::OpenAIError;
use thiserror::Error;

/// Result type alias for fill operations.
pub type Result<T> = std::result::Result<T, FillError>;

/// Errors that can occur while filling a model.
#[derive(Debug, Error)]
pub enum FillError {
    /// Completion handle could not be initialized (missing credential)
    #[error("config error: {0}")]
    Config(String),

    /// Image attachment could not be read
    #[error("failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Completion request failed at the transport or service layer
    #[error("completion error: {0}")]
    Completion(#[from] OpenAIError),

    /// Response content is not valid JSON
    #[error("response is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// Parsed JSON does not satisfy the target model
    #[error("response does not match the model: {0}")]
    Validation(#[from] ValidationError),
}

/// Distinct failure modes of typed construction from decoded JSON.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is absent
    #[error("missing required field `{field}`")]
    MissingField { field: String },

    /// A field holds a value of an incompatible type
    #[error("type mismatch: {detail}")]
    TypeMismatch { detail: String },

    /// An enum field holds a value outside its declared variants
    #[error("unknown variant: {detail}")]
    UnknownVariant { detail: String },

    /// Any other structural mismatch
    #[error("invalid structure: {0}")]
    Structure(#[source] serde_json::Error),
}

impl ValidationError {
    /// Sort a serde decode failure into a distinct validation variant.
    ///
    /// serde_json reports construction failures as formatted messages with
    /// stable prefixes; those prefixes are the only classification signal
    /// it exposes.
    pub(crate) fn classify(err: serde_json::Error) -> Self {
        let msg = err.to_string();

        if let Some(rest) = msg.strip_prefix("missing field `") {
            if let Some(field) = rest.split('`').next() {
                return Self::MissingField {
                    field: field.to_string(),
                };
            }
        }
        if msg.starts_with("invalid type") || msg.starts_with("invalid value") {
            return Self::TypeMismatch { detail: msg };
        }
        if msg.starts_with("unknown variant") {
            return Self::UnknownVariant { detail: msg };
        }

        Self::Structure(err)
    }
}
