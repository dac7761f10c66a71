//! Retrieval pipeline errors.

use folio_llm::LlmError;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors from the semantic retrieval pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// `ask` was called before `init` completed.
    #[error("pipeline not initialized")]
    NotReady,

    /// The embedder failed.
    #[error("embedding failed: {0}")]
    Embedding(#[source] LlmError),

    /// The language model failed while generating.
    #[error("generation failed: {0}")]
    Generation(#[source] LlmError),

    /// A document file could not be read.
    #[error("failed to read documents '{path}': {source}")]
    DocumentLoad {
        path: String,
        source: std::io::Error,
    },

    /// A document file did not parse.
    #[error("failed to parse documents: {0}")]
    DocumentParse(#[from] serde_json::Error),

    /// The document set is unusable (empty, duplicate ids, ...).
    #[error("invalid documents: {0}")]
    InvalidDocuments(String),

    /// A vector does not have the embedder's dimensionality.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl RetrievalError {
    /// True when asking again later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Embedding(e) | Self::Generation(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_follows_llm_error() {
        assert!(RetrievalError::Embedding(LlmError::Network("reset".to_string())).is_transient());
        assert!(
            RetrievalError::Generation(LlmError::RateLimit("slow down".to_string())).is_transient()
        );
        assert!(!RetrievalError::Generation(LlmError::Auth("denied".to_string())).is_transient());
        assert!(!RetrievalError::NotReady.is_transient());
    }
}
