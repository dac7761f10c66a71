//! External model boundaries for folio.
//!
//! Both response engines treat models as opaque services. This crate holds
//! the two seams they talk through:
//!
//! ```text
//! ┌──────────────────────────┐     ┌──────────────────────────────┐
//! │  Embedder trait          │     │  LlmBackend trait            │
//! │  - embed() -> Vec<f32>   │     │  - complete() -> Response    │
//! │  - warm_up()             │     │  - health_check()            │
//! └──────────────────────────┘     └──────────────────────────────┘
//!      │      │      │      │          │               │
//!      ▼      ▼      ▼      ▼          ▼               ▼
//!   Local  Hashing  Mock  OpenAI      Mock        OpenAI-compatible
//!   (ONNX)                                       (OpenAI, Ollama, ...)
//! ```
//!
//! Nothing here retries. A failed call surfaces as [`LlmError`] and the
//! caller decides what the user sees.

pub mod backend;
pub mod embeddings;
pub mod error;
pub mod openai;
pub mod types;

pub use backend::{LlmBackend, MockBackend, SharedBackend};
pub use error::{LlmError, Result};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, Usage};

pub use embeddings::{
    DEFAULT_DIMENSIONS, Embedder, EmbedderSpec, HashingEmbedder, MockEmbedder, OpenAiEmbedder,
    OpenAiEmbedderConfig, ProgressFn, SharedEmbedder, WarmUpProgress, build_embedder,
    cosine_similarity, default_local_model_dir, dot, download_model_file, l2_normalize,
};

#[cfg(feature = "local-embeddings")]
pub use embeddings::local::{LocalEmbedder, LocalEmbedderConfig};

pub use openai::{OpenAiBackend, OpenAiConfig};
