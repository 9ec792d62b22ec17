//! Typed errors for the OpenAI client.

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, OpenAIError>;

/// Errors returned by the OpenAI client.
///
/// Failures are surfaced as-is: the client performs no retry or backoff.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Configuration error (missing API key, invalid settings)
    #[error("configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// API error (non-2xx response, rate limit, invalid request)
    #[error("API error: {0}")]
    Api(String),

    /// Parse error (unexpected response body)
    #[error("parse error: {0}")]
    Parse(String),
}
