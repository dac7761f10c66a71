//! In-memory vector index with a session-scoped embedding cache.
//!
//! Linear scan over normalized vectors, so similarity is a dot product. Fine
//! for the few dozen documents a portfolio has.

use folio_llm::{Embedder, dot};
use folio_session::SessionStore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::{Result, RetrievalError};

/// Session store key holding the cached index.
pub const CACHE_KEY: &str = "folio.kb_embeddings";

/// Cache entry layout.
#[derive(Debug, Serialize, Deserialize)]
struct CachedIndex {
    hash: String,
    embeddings: Vec<Vec<f32>>,
}

/// SHA-256 (hex) of the `id:len|id:len|...` fingerprint of `documents`.
pub fn fingerprint(documents: &[Document]) -> String {
    let joined = documents
        .iter()
        .map(Document::fingerprint)
        .collect::<Vec<_>>()
        .join("|");
    hex::encode(Sha256::digest(joined.as_bytes()))
}

/// Where an index's embeddings came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// Reused from the session store without calling the embedder.
    Cache,
    /// Computed now.
    Embedded,
}

/// A document with its similarity to a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDocument<'a> {
    pub document: &'a Document,
    pub score: f32,
}

/// Documents and their embeddings, index-aligned.
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    documents: Vec<Document>,
    embeddings: Vec<Vec<f32>>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Dimensionality of stored vectors, once indexed.
    pub fn dimensions(&self) -> Option<usize> {
        self.embeddings.first().map(Vec::len)
    }

    /// Embed `documents` and replace the current contents.
    ///
    /// With a `cache`, a stored index whose fingerprint and shape match is
    /// reused and the embedder is not called. A fresh index is written back.
    /// Cache trouble of any kind is logged and otherwise ignored.
    /// `on_progress(done, total)` fires after each document.
    pub async fn index(
        &mut self,
        documents: Vec<Document>,
        embedder: &dyn Embedder,
        cache: Option<&SessionStore>,
        mut on_progress: impl FnMut(usize, usize),
    ) -> Result<IndexSource> {
        let total = documents.len();
        let hash = fingerprint(&documents);

        if let Some(store) = cache {
            if let Some(embeddings) = load_cache(store, &hash, total, embedder.dimensions()).await {
                info!(documents = total, "Reusing cached embeddings");
                self.documents = documents;
                self.embeddings = embeddings;
                on_progress(total, total);
                return Ok(IndexSource::Cache);
            }
        }

        let expected = embedder.dimensions();
        let mut embeddings = Vec::with_capacity(total);
        for (i, doc) in documents.iter().enumerate() {
            let vector = embedder
                .embed(&doc.content)
                .await
                .map_err(RetrievalError::Embedding)?;
            if vector.len() != expected {
                return Err(RetrievalError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            embeddings.push(vector);
            on_progress(i + 1, total);
        }
        info!(documents = total, embedder = embedder.name(), "Indexed documents");

        if let Some(store) = cache {
            save_cache(store, hash, &embeddings).await;
        }
        self.documents = documents;
        self.embeddings = embeddings;
        Ok(IndexSource::Embedded)
    }

    /// Documents scoring at least `threshold`, best first, at most `top_k`.
    /// Equal scores keep document order.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredDocument<'_>>> {
        if let Some(expected) = self.dimensions() {
            if query.len() != expected {
                return Err(RetrievalError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }

        let mut scored: Vec<ScoredDocument<'_>> = self
            .documents
            .iter()
            .zip(&self.embeddings)
            .map(|(document, embedding)| ScoredDocument {
                document,
                score: dot(query, embedding),
            })
            .filter(|hit| hit.score >= threshold)
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}

async fn load_cache(
    store: &SessionStore,
    hash: &str,
    count: usize,
    dimensions: usize,
) -> Option<Vec<Vec<f32>>> {
    let raw = store.get(CACHE_KEY).await?;
    let cached: CachedIndex = match serde_json::from_str(&raw) {
        Ok(cached) => cached,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable embedding cache");
            return None;
        }
    };
    if cached.hash != hash {
        debug!("Embedding cache is for a different document set");
        return None;
    }
    if cached.embeddings.len() != count || cached.embeddings.iter().any(|e| e.len() != dimensions)
    {
        warn!(
            cached = cached.embeddings.len(),
            expected = count,
            "Embedding cache shape does not match, re-indexing"
        );
        return None;
    }
    Some(cached.embeddings)
}

async fn save_cache(store: &SessionStore, hash: String, embeddings: &[Vec<f32>]) {
    let entry = CachedIndex {
        hash,
        embeddings: embeddings.to_vec(),
    };
    let json = match serde_json::to_string(&entry) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Could not serialize embedding cache");
            return;
        }
    };
    if let Err(e) = store.set(CACHE_KEY, json).await {
        warn!(error = %e, "Could not save embedding cache");
    }
}
