//! Error types for the model boundary crate.

use thiserror::Error;

/// Result type alias using the LLM error type.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Error type for embedding and completion calls.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider answered with an error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Could not reach the provider, or the request timed out.
    #[error("Network error: {0}")]
    Network(String),

    /// Misconfiguration (missing API key, unknown provider, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Response body did not parse.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Provider throttled us.
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Credentials were refused.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LlmError {
    /// True for failures a user could reasonably retry by asking again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimit(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            LlmError::Network(format!("Connection failed: {}", err))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Serialization(err.to_string())
    }
}
