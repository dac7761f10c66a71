//! Error types for session store operations.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Writing the value would push the store past its byte quota.
    #[error("Quota exceeded writing '{key}': {requested} bytes requested, {available} available")]
    QuotaExceeded {
        key: String,
        requested: usize,
        available: usize,
    },

    /// Keys must be non-empty.
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, SessionError>;
