//! Portfolio documents the retriever searches.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

const BUILTIN_DOCUMENTS: &str = include_str!("../data/documents.json");

/// Optional document attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Coarse subject ("projects", "skills", ...). Template answers only merge
    /// documents that share the top hit's topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// One retrievable passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::default(),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.metadata.topic = Some(topic.into());
        self
    }

    /// Topic, with a missing one read as the empty string.
    pub fn topic(&self) -> &str {
        self.metadata.topic.as_deref().unwrap_or("")
    }

    /// `id:len` part of the index fingerprint. Length is in UTF-16 code
    /// units so fingerprints agree with browser-built caches.
    pub fn fingerprint(&self) -> String {
        format!("{}:{}", self.id, self.content.encode_utf16().count())
    }
}

/// The document set compiled into the crate.
pub fn builtin_documents() -> Result<Vec<Document>> {
    parse_documents(BUILTIN_DOCUMENTS)
}

/// Parse a JSON array of documents.
pub fn parse_documents(json: &str) -> Result<Vec<Document>> {
    let documents: Vec<Document> = serde_json::from_str(json)?;
    validate(&documents)?;
    Ok(documents)
}

/// Read a JSON document file.
pub fn load_documents(path: impl AsRef<Path>) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let content =
        std::fs::read_to_string(path).map_err(|source| RetrievalError::DocumentLoad {
            path: path.display().to_string(),
            source,
        })?;
    let documents = parse_documents(&content)?;
    tracing::debug!(path = %path.display(), count = documents.len(), "Loaded documents");
    Ok(documents)
}

fn validate(documents: &[Document]) -> Result<()> {
    if documents.is_empty() {
        return Err(RetrievalError::InvalidDocuments(
            "document set is empty".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for doc in documents {
        if doc.id.trim().is_empty() {
            return Err(RetrievalError::InvalidDocuments(
                "document with empty id".to_string(),
            ));
        }
        if !seen.insert(doc.id.as_str()) {
            return Err(RetrievalError::InvalidDocuments(format!(
                "duplicate document id '{}'",
                doc.id
            )));
        }
    }
    Ok(())
}
