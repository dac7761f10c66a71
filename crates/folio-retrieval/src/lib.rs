//! Semantic question answering over portfolio documents.
//!
//! ```text
//! init:  warm up embedder ─▶ index (session cache) ─▶ check generator ─▶ ready
//! ask:   embed question ─▶ dot-product search ─▶ template or LLM answer
//! ```
//!
//! Embedding and generation are external services reached through the
//! `folio-llm` traits. The index is cached in a [`folio_session::SessionStore`]
//! keyed by a fingerprint of the documents, so re-initializing in the same
//! session costs no embedding calls.

mod document;
mod error;
mod generator;
mod pipeline;
mod store;

pub use document::{Document, Metadata, builtin_documents, load_documents, parse_documents};
pub use error::{Result, RetrievalError};
pub use generator::{
    Generator, GeneratorCapability, GeneratorMode, GeneratorSettings, NO_CONTEXT_ANSWER,
    SYSTEM_PROMPT, build_request, template_answer, topic_intro,
};
pub use pipeline::{
    Answer, FAILURE_MESSAGE, PipelineStatus, RetrieverConfig, SemanticRetriever, Source, Timing,
};
pub use store::{CACHE_KEY, IndexSource, ScoredDocument, VectorStore, fingerprint};
