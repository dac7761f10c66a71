//! Knowledge base loading errors.
//!
//! Matching itself never fails; only loading a knowledge base can.

/// Result type alias for matcher operations.
pub type Result<T> = std::result::Result<T, MatcherError>;

/// Errors raised while loading or validating a knowledge base.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    /// Failed to read a knowledge base file.
    #[error("failed to read knowledge base '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse knowledge base: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to parse JSON.
    #[error("failed to parse knowledge base JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    /// An entry failed validation.
    #[error("invalid knowledge base entry #{index}: {reason}")]
    InvalidEntry { index: usize, reason: String },

    /// Fallback or pre-filter data failed validation.
    #[error("invalid knowledge base: {0}")]
    Invalid(String),
}
