//! The semantic retriever: embed, retrieve, generate.

use std::fmt;
use std::time::Instant;

use folio_llm::{SharedBackend, SharedEmbedder, WarmUpProgress};
use folio_session::SessionStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::document::{Document, Metadata};
use crate::error::{Result, RetrievalError};
use crate::generator::{Generator, GeneratorCapability, GeneratorMode, GeneratorSettings};
use crate::store::{IndexSource, VectorStore};

/// Shown when answering fails for any reason.
pub const FAILURE_MESSAGE: &str = "Something went wrong. Try rephrasing your question.";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Retriever tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieverConfig {
    /// Maximum passages per answer.
    pub top_k: usize,

    /// Minimum similarity for a passage to count.
    pub threshold: f32,

    /// Use a language model when one is configured and reachable.
    pub generator_enabled: bool,

    pub generator: GeneratorSettings,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            threshold: 0.10,
            generator_enabled: true,
            generator: GeneratorSettings::default(),
        }
    }
}

impl RetrieverConfig {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_generator_enabled(mut self, enabled: bool) -> Self {
        self.generator_enabled = enabled;
        self
    }

    pub fn with_generator(mut self, settings: GeneratorSettings) -> Self {
        self.generator = settings;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Status & Results
// ─────────────────────────────────────────────────────────────────────────────

/// Initialization progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum PipelineStatus {
    Idle,
    LoadingEmbedder,
    DownloadingModel {
        file: &'static str,
        received: u64,
        total: Option<u64>,
    },
    Indexing { done: usize, total: usize },
    LoadingGenerator,
    Ready,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::LoadingEmbedder => write!(f, "Loading embedding model..."),
            Self::DownloadingModel {
                file,
                received,
                total: Some(total),
            } if *total > 0 => write!(
                f,
                "Downloading {file}... {:.1}/{:.1} MB ({}%)",
                *received as f64 / 1e6,
                *total as f64 / 1e6,
                received * 100 / total
            ),
            Self::DownloadingModel { file, received, .. } => {
                write!(f, "Downloading {file}... {:.1} MB", *received as f64 / 1e6)
            }
            Self::Indexing { done, total } => write!(f, "Building vector index... {done}/{total}"),
            Self::LoadingGenerator => write!(f, "Checking generator..."),
            Self::Ready => write!(f, "Ready"),
        }
    }
}

/// Stage durations for one question, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub embed_ms: f64,
    pub retrieve_ms: f64,
    pub generate_ms: f64,
    pub total_ms: f64,
}

/// A passage an answer drew on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub content: String,
    /// Similarity, rounded to three decimals.
    pub score: f64,
    pub metadata: Metadata,
}

/// The retriever's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<Source>,
    pub timing: Timing,
    pub mode: GeneratorMode,
}

fn round3(score: f32) -> f64 {
    (f64::from(score) * 1000.0).round() / 1000.0
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

// ─────────────────────────────────────────────────────────────────────────────
// Retriever
// ─────────────────────────────────────────────────────────────────────────────

/// Semantic question answering over a fixed document set.
///
/// `init` must finish before `ask`; until then `ask` returns
/// [`RetrievalError::NotReady`].
pub struct SemanticRetriever {
    embedder: SharedEmbedder,
    backend: Option<SharedBackend>,
    session: SessionStore,
    config: RetrieverConfig,
    store: VectorStore,
    generator: Option<Generator>,
    status: PipelineStatus,
}

impl SemanticRetriever {
    /// A retriever caching its index in `session`.
    pub fn new(embedder: SharedEmbedder, session: SessionStore) -> Self {
        Self {
            embedder,
            backend: None,
            session,
            config: RetrieverConfig::default(),
            store: VectorStore::new(),
            generator: None,
            status: PipelineStatus::Idle,
        }
    }

    pub fn with_backend(mut self, backend: SharedBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_config(mut self, config: RetrieverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    pub fn is_ready(&self) -> bool {
        self.generator.is_some()
    }

    /// Generation mode, once initialized.
    pub fn mode(&self) -> Option<GeneratorMode> {
        self.generator.as_ref().map(Generator::mode)
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    fn set_status(&mut self, status: PipelineStatus, on_status: &mut impl FnMut(PipelineStatus)) {
        self.status = status;
        on_status(status);
    }

    /// Warm up the embedder, index `documents` and check the generator.
    ///
    /// `on_status` sees every transition, including per-document indexing
    /// progress. Only embedding failures are errors; an unusable generator
    /// means template mode. Calling `init` again re-indexes, which is served
    /// from the session cache when the documents are unchanged.
    pub async fn init(
        &mut self,
        documents: Vec<Document>,
        mut on_status: impl FnMut(PipelineStatus) + Send,
    ) -> Result<GeneratorMode> {
        self.generator = None;

        self.set_status(PipelineStatus::LoadingEmbedder, &mut on_status);
        let mut forward = |progress: WarmUpProgress| match progress {
            WarmUpProgress::Download {
                file,
                received,
                total,
            } => on_status(PipelineStatus::DownloadingModel {
                file,
                received,
                total,
            }),
            WarmUpProgress::Load => on_status(PipelineStatus::LoadingEmbedder),
        };
        self.embedder
            .warm_up(&mut forward)
            .await
            .map_err(RetrievalError::Embedding)?;

        let total = documents.len();
        self.set_status(PipelineStatus::Indexing { done: 0, total }, &mut on_status);
        let source = self
            .store
            .index(
                documents,
                self.embedder.as_ref(),
                Some(&self.session),
                |done, total| on_status(PipelineStatus::Indexing { done, total }),
            )
            .await?;
        self.status = PipelineStatus::Indexing { done: total, total };
        debug!(
            cached = source == IndexSource::Cache,
            documents = total,
            "Index ready"
        );

        self.set_status(PipelineStatus::LoadingGenerator, &mut on_status);
        let capability =
            GeneratorCapability::detect(self.backend.clone(), self.config.generator_enabled).await;
        let generator = Generator::new(capability, self.config.generator.clone());
        let mode = generator.mode();
        self.generator = Some(generator);

        self.set_status(PipelineStatus::Ready, &mut on_status);
        info!(
            %mode,
            embedder = self.embedder.name(),
            documents = total,
            "Semantic retriever ready"
        );
        Ok(mode)
    }

    /// Answer `question` from the indexed documents.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let generator = self.generator.as_ref().ok_or(RetrievalError::NotReady)?;

        let t0 = Instant::now();
        let query = self
            .embedder
            .embed(question)
            .await
            .map_err(RetrievalError::Embedding)?;
        let embed_ms = elapsed_ms(t0);

        let t1 = Instant::now();
        let hits = self
            .store
            .search(&query, self.config.top_k, self.config.threshold)?;
        let retrieve_ms = elapsed_ms(t1);

        let t2 = Instant::now();
        let answer = generator.generate(question, &hits).await?;
        let generate_ms = elapsed_ms(t2);

        debug!(
            hits = hits.len(),
            top_score = hits.first().map(|h| h.score),
            embed_ms,
            retrieve_ms,
            generate_ms,
            "Answered question"
        );

        Ok(Answer {
            answer,
            sources: hits
                .iter()
                .map(|hit| Source {
                    id: hit.document.id.clone(),
                    content: hit.document.content.clone(),
                    score: round3(hit.score),
                    metadata: hit.document.metadata.clone(),
                })
                .collect(),
            timing: Timing {
                embed_ms,
                retrieve_ms,
                generate_ms,
                total_ms: embed_ms + retrieve_ms + generate_ms,
            },
            mode: generator.mode(),
        })
    }

    /// Like [`ask`](Self::ask), but a failure becomes a generic apology.
    pub async fn respond(&self, question: &str) -> Answer {
        match self.ask(question).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, transient = e.is_transient(), "Query failed");
                Answer {
                    answer: FAILURE_MESSAGE.to_string(),
                    sources: Vec::new(),
                    timing: Timing::default(),
                    mode: self.mode().unwrap_or(GeneratorMode::Template),
                }
            }
        }
    }
}

impl fmt::Debug for SemanticRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticRetriever")
            .field("embedder", &self.embedder.name())
            .field("documents", &self.store.len())
            .field("status", &self.status)
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}
