//! Text embeddings for semantic retrieval.
//!
//! This module provides the [`Embedder`] trait and implementations that turn
//! text into L2-normalized vectors, so cosine similarity reduces to a dot
//! product.
//!
//! # Implementations
//!
//! - [`HashingEmbedder`]: offline bag-of-words feature hashing; similarity tracks word overlap
//! - [`MockEmbedder`]: deterministic pseudo-random vectors for tests
//! - [`OpenAiEmbedder`]: OpenAI's (or a compatible server's) embeddings API
//! - `local::LocalEmbedder`: all-MiniLM-L6-v2 on ONNX Runtime (requires the
//!   `local-embeddings` feature)

use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::error::{LlmError, Result};

/// Dimensionality of the default embedders (matches all-MiniLM-L6-v2).
pub const DEFAULT_DIMENSIONS: usize = 384;

// ─────────────────────────────────────────────────────────────────────────────
// Embedder Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Progress reported while an embedder prepares its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmUpProgress {
    /// A model file is being fetched. `total` is `None` when the server sends
    /// no length.
    Download {
        file: &'static str,
        received: u64,
        total: Option<u64>,
    },
    /// Files are in place and the model is being loaded.
    Load,
}

/// Callback receiving [`WarmUpProgress`] events.
pub type ProgressFn<'a> = &'a mut (dyn FnMut(WarmUpProgress) + Send);

/// Trait for generating text embeddings.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for several texts, in order.
    ///
    /// The default calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Prepare the model before first use (download, load, connect).
    ///
    /// In-process embedders have nothing to do.
    async fn warm_up(&self, _on_progress: ProgressFn<'_>) -> Result<()> {
        Ok(())
    }

    /// Dimensionality of produced vectors.
    fn dimensions(&self) -> usize;

    /// Name of this embedder.
    fn name(&self) -> &str;
}

/// A shared embedder that can be used across threads.
pub type SharedEmbedder = Arc<dyn Embedder>;

// ─────────────────────────────────────────────────────────────────────────────
// Hashing Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// Words too common to carry meaning in a portfolio question.
const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "can", "could", "did", "do",
    "does", "for", "from", "had", "has", "have", "her", "his", "how", "i", "in", "is", "it",
    "its", "me", "my", "of", "on", "or", "our", "she", "so", "some", "tell", "that", "the",
    "their", "them", "there", "these", "they", "this", "to", "was", "we", "were", "what",
    "when", "where", "which", "who", "why", "will", "with", "would", "you", "your",
];

/// Offline embedder using signed feature hashing over content words.
///
/// Each remaining token is hashed into one of `dimensions` buckets with a
/// hash-derived sign, and the vector is L2-normalized. Two texts score high
/// when they share vocabulary, which is enough for a small curated corpus.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create a hashing embedder with the given number of buckets.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Content words of `text`: lower-cased, stopwords dropped, plural `s` trimmed.
    pub fn tokens(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
            .map(|t| {
                if t.len() > 3 && t.ends_with('s') && !t.ends_with("ss") {
                    t[..t.len() - 1].to_string()
                } else {
                    t.to_string()
                }
            })
            .collect()
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dimensions];
        for token in Self::tokens(text) {
            let hash = simple_hash(&token);
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }
        l2_normalize(&mut embedding);
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// A mock embedder for testing purposes.
///
/// Same text always yields the same unit vector; different texts yield
/// unrelated ones.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    /// Create a new mock embedder with the specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut state = simple_hash(text);
        let mut embedding: Vec<f32> = (0..self.dimensions)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                ((state >> 16) as u16 as f32 / 32768.0) - 1.0
            })
            .collect();
        l2_normalize(&mut embedding);
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// djb2, stable across runs and platforms.
fn simple_hash(s: &str) -> u64 {
    let mut hash: u64 = 5381;
    for byte in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(byte as u64);
    }
    hash
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for OpenAI embeddings.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedderConfig {
    /// API key for authentication.
    pub api_key: Option<String>,
    /// Base URL for the API.
    pub base_url: String,
    /// Model to use for embeddings.
    pub model: String,
    /// Requested output dimensions (models that support shortening honor it).
    pub dimensions: Option<usize>,
    /// Request timeout.
    pub timeout: Duration,
}

impl OpenAiEmbedderConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Request a specific output size.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

/// OpenAI embeddings API client.
pub struct OpenAiEmbedder {
    client: Client,
    config: OpenAiEmbedderConfig,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// Create a new OpenAI embedder.
    pub fn new(config: OpenAiEmbedderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let dimensions = config.dimensions.unwrap_or(match config.model.as_str() {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        });

        Ok(Self {
            client,
            config,
            dimensions,
        })
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Internal("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: self.config.model.clone(),
            input: texts.iter().map(|s| s.to_string()).collect(),
            dimensions: self.config.dimensions,
        };

        let mut builder = self.client.post(self.embeddings_url()).json(&request);
        if let Some(ref key) = self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LlmError::Auth(body),
                429 => LlmError::RateLimit(body),
                _ => LlmError::Backend(format!(
                    "Embedding request failed: HTTP {} - {}",
                    status, body
                )),
            });
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Serialization(format!("Failed to parse response: {}", e)))?;

        let mut data = result.data;
        data.sort_by_key(|e| e.index);

        Ok(data
            .into_iter()
            .map(|e| {
                let mut v = e.embedding;
                l2_normalize(&mut v);
                v
            })
            .collect())
    }

    async fn warm_up(&self, _on_progress: ProgressFn<'_>) -> Result<()> {
        let sample = self.embed("warm up").await?;
        if sample.len() != self.dimensions {
            return Err(LlmError::Config(format!(
                "Embedding model returned {} dimensions, expected {}",
                sample.len(),
                self.dimensions
            )));
        }
        Ok(())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Debug, serde::Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, serde::Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, serde::Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}


// ─────────────────────────────────────────────────────────────────────────────
// Model Files
// ─────────────────────────────────────────────────────────────────────────────

/// Fetch `url` into `dest`, reporting progress as `file`.
///
/// The body is streamed to a `.part` sibling and renamed into place once
/// complete, so an interrupted download never leaves a truncated model behind.
/// Returns the number of bytes written.
pub async fn download_model_file(
    client: &Client,
    url: &str,
    dest: &Path,
    file: &'static str,
    on_progress: ProgressFn<'_>,
) -> Result<u64> {
    let io_error = |path: &Path, e: std::io::Error| {
        LlmError::Internal(format!("Failed to write {}: {}", path.display(), e))
    };

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(parent, e))?;
    }

    let mut response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(LlmError::Backend(format!(
            "Download of {} failed: HTTP {}",
            url,
            response.status()
        )));
    }

    let total = response.content_length();
    let partial = dest.with_extension("part");
    let mut out = tokio::fs::File::create(&partial)
        .await
        .map_err(|e| io_error(&partial, e))?;

    let mut received = 0u64;
    on_progress(WarmUpProgress::Download {
        file,
        received,
        total,
    });
    while let Some(chunk) = response.chunk().await? {
        out.write_all(&chunk)
            .await
            .map_err(|e| io_error(&partial, e))?;
        received += chunk.len() as u64;
        on_progress(WarmUpProgress::Download {
            file,
            received,
            total,
        });
    }
    out.flush().await.map_err(|e| io_error(&partial, e))?;
    drop(out);

    tokio::fs::rename(&partial, dest)
        .await
        .map_err(|e| io_error(dest, e))?;
    tracing::info!(file, bytes = received, path = %dest.display(), "Downloaded model file");
    Ok(received)
}

/// Default cache directory for the local embedding model.
pub fn default_local_model_dir() -> Option<std::path::PathBuf> {
    dirs::data_dir().map(|d| d.join("folio").join("models").join("all-MiniLM-L6-v2"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Local Embedder (ONNX Runtime)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "local-embeddings")]
pub mod local {
    //! Local sentence embeddings with all-MiniLM-L6-v2 on ONNX Runtime.
    //!
    //! This module requires the `local-embeddings` feature. The model and
    //! tokenizer are fetched into the model directory on first warm-up and
    //! reused on later runs.

    use super::*;
    use parking_lot::Mutex;
    use std::path::PathBuf;

    use ort::session::Session;
    use ort::session::builder::GraphOptimizationLevel;
    use ort::value::Tensor;
    use tokenizers::{Encoding, Tokenizer, TruncationParams};

    pub const DEFAULT_MODEL_URL: &str =
        "https://huggingface.co/Xenova/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx";
    pub const DEFAULT_TOKENIZER_URL: &str =
        "https://huggingface.co/Xenova/all-MiniLM-L6-v2/resolve/main/tokenizer.json";

    const MODEL_FILE: &str = "model.onnx";
    const TOKENIZER_FILE: &str = "tokenizer.json";

    /// Longest sequence the model was trained on.
    const MAX_TOKENS: usize = 256;

    /// Encodings per inference call.
    const BATCH_SIZE: usize = 32;

    /// Where the model lives and where to fetch it from.
    #[derive(Debug, Clone)]
    pub struct LocalEmbedderConfig {
        pub model_dir: PathBuf,
        pub model_url: String,
        pub tokenizer_url: String,
        pub dimensions: usize,
        /// Timeout for each file download.
        pub timeout: Duration,
    }

    impl LocalEmbedderConfig {
        pub fn new(model_dir: impl Into<PathBuf>) -> Self {
            Self {
                model_dir: model_dir.into(),
                model_url: DEFAULT_MODEL_URL.to_string(),
                tokenizer_url: DEFAULT_TOKENIZER_URL.to_string(),
                dimensions: DEFAULT_DIMENSIONS,
                timeout: Duration::from_secs(600),
            }
        }

        pub fn with_model_url(mut self, url: impl Into<String>) -> Self {
            self.model_url = url.into();
            self
        }

        pub fn with_tokenizer_url(mut self, url: impl Into<String>) -> Self {
            self.tokenizer_url = url.into();
            self
        }

        pub fn with_dimensions(mut self, dimensions: usize) -> Self {
            self.dimensions = dimensions;
            self
        }

        pub fn model_path(&self) -> PathBuf {
            self.model_dir.join(MODEL_FILE)
        }

        pub fn tokenizer_path(&self) -> PathBuf {
            self.model_dir.join(TOKENIZER_FILE)
        }
    }

    struct LoadedModel {
        session: Session,
        tokenizer: Tokenizer,
    }

    /// Local embedder using ONNX Runtime.
    ///
    /// Mean-pools the last hidden state over real tokens and L2-normalizes
    /// the result. Nothing is loaded until [`Embedder::warm_up`] runs.
    pub struct LocalEmbedder {
        config: LocalEmbedderConfig,
        client: Client,
        model: Mutex<Option<LoadedModel>>,
    }

    impl LocalEmbedder {
        pub fn new(config: LocalEmbedderConfig) -> Result<Self> {
            let client = Client::builder()
                .timeout(config.timeout)
                .build()
                .map_err(|e| LlmError::Internal(format!("Failed to create HTTP client: {}", e)))?;
            Ok(Self {
                config,
                client,
                model: Mutex::new(None),
            })
        }

        /// Whether the session and tokenizer are loaded.
        pub fn is_loaded(&self) -> bool {
            self.model.lock().is_some()
        }

        fn load(&self) -> Result<LoadedModel> {
            let model_path = self.config.model_path();
            let session = Session::builder()
                .map_err(|e| onnx_error("Failed to create ONNX session", e))?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .map_err(|e| onnx_error("Failed to set optimization level", e))?
                .commit_from_file(&model_path)
                .map_err(|e| {
                    onnx_error(&format!("Failed to load {}", model_path.display()), e)
                })?;

            let tokenizer_path = self.config.tokenizer_path();
            let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
                LlmError::Internal(format!(
                    "Failed to load tokenizer from {}: {}",
                    tokenizer_path.display(),
                    e
                ))
            })?;
            tokenizer
                .with_truncation(Some(TruncationParams {
                    max_length: MAX_TOKENS,
                    ..Default::default()
                }))
                .map_err(|e| LlmError::Internal(format!("Invalid truncation: {}", e)))?;

            Ok(LoadedModel { session, tokenizer })
        }
    }

    fn onnx_error(context: &str, e: impl std::fmt::Display) -> LlmError {
        LlmError::Internal(format!("{}: {}", context, e))
    }

    #[async_trait]
    impl Embedder for LocalEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.embed_batch(&[text])
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| LlmError::Internal("No embedding returned".to_string()))
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let mut guard = self.model.lock();
            let model = guard.as_mut().ok_or_else(|| {
                LlmError::Config("Local embedding model is not loaded; call warm_up first".to_string())
            })?;

            let encodings = model
                .tokenizer
                .encode_batch(texts.to_vec(), true)
                .map_err(|e| LlmError::Internal(format!("Tokenization failed: {}", e)))?;

            let mut results = Vec::with_capacity(texts.len());
            for chunk in encodings.chunks(BATCH_SIZE) {
                results.extend(run_batch(&mut model.session, chunk, self.config.dimensions)?);
            }
            Ok(results)
        }

        async fn warm_up(&self, on_progress: ProgressFn<'_>) -> Result<()> {
            if self.is_loaded() {
                return Ok(());
            }

            let files = [
                (self.config.model_path(), &self.config.model_url, MODEL_FILE),
                (self.config.tokenizer_path(), &self.config.tokenizer_url, TOKENIZER_FILE),
            ];
            for (path, url, file) in files {
                if !path.exists() {
                    download_model_file(&self.client, url, &path, file, &mut *on_progress).await?;
                }
            }

            on_progress(WarmUpProgress::Load);
            let loaded = self.load()?;
            *self.model.lock() = Some(loaded);
            tracing::debug!(dir = %self.config.model_dir.display(), "Local embedding model loaded");
            Ok(())
        }

        fn dimensions(&self) -> usize {
            self.config.dimensions
        }

        fn name(&self) -> &str {
            "local"
        }
    }

    /// Run one padded batch through the model and mean-pool each row.
    fn run_batch(
        session: &mut Session,
        encodings: &[Encoding],
        dimensions: usize,
    ) -> Result<Vec<Vec<f32>>> {
        let batch = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut ids = vec![0i64; batch * seq_len];
        let mut mask = vec![0i64; batch * seq_len];
        let mut types = vec![0i64; batch * seq_len];
        for (i, enc) in encodings.iter().enumerate() {
            let offset = i * seq_len;
            let rows = enc
                .get_ids()
                .iter()
                .zip(enc.get_attention_mask())
                .zip(enc.get_type_ids());
            for (j, ((&id, &m), &t)) in rows.enumerate() {
                ids[offset + j] = i64::from(id);
                mask[offset + j] = i64::from(m);
                types[offset + j] = i64::from(t);
            }
        }

        let shape = [batch, seq_len];
        let input_ids =
            Tensor::from_array((shape, ids)).map_err(|e| onnx_error("Bad input_ids", e))?;
        let attention_mask = Tensor::from_array((shape, mask.clone()))
            .map_err(|e| onnx_error("Bad attention_mask", e))?;
        let token_type_ids =
            Tensor::from_array((shape, types)).map_err(|e| onnx_error("Bad token_type_ids", e))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => token_type_ids,
            ])
            .map_err(|e| onnx_error("ONNX inference failed", e))?;

        let (out_shape, hidden_states) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| onnx_error("Output extraction failed", e))?;
        // (batch, seq_len, hidden)
        if out_shape.len() != 3 {
            return Err(LlmError::Internal(format!(
                "Unexpected output rank {}",
                out_shape.len()
            )));
        }
        let seq_out = out_shape[1] as usize;
        let hidden = out_shape[2] as usize;
        if hidden != dimensions {
            return Err(LlmError::Config(format!(
                "Local model produces {} dimensions, expected {}",
                hidden, dimensions
            )));
        }

        let mut results = Vec::with_capacity(batch);
        for i in 0..batch {
            let mut pooled = vec![0.0f32; hidden];
            let mut count = 0.0f32;
            for j in 0..seq_out.min(seq_len) {
                if mask[i * seq_len + j] == 0 {
                    continue;
                }
                let start = (i * seq_out + j) * hidden;
                for (acc, v) in pooled.iter_mut().zip(&hidden_states[start..start + hidden]) {
                    *acc += v;
                }
                count += 1.0;
            }
            if count > 0.0 {
                pooled.iter_mut().for_each(|v| *v /= count);
            }
            l2_normalize(&mut pooled);
            results.push(pooled);
        }
        Ok(results)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_embed_before_warm_up_fails() {
            let dir = tempfile::tempdir().unwrap();
            let embedder = LocalEmbedder::new(LocalEmbedderConfig::new(dir.path())).unwrap();

            assert!(!embedder.is_loaded());
            assert_eq!(embedder.name(), "local");
            assert_eq!(embedder.dimensions(), DEFAULT_DIMENSIONS);
            assert!(matches!(
                embedder.embed("hello").await,
                Err(LlmError::Config(_))
            ));
        }

        #[tokio::test]
        async fn test_warm_up_reports_missing_model() {
            let dir = tempfile::tempdir().unwrap();
            let config = LocalEmbedderConfig::new(dir.path())
                .with_model_url("http://127.0.0.1:9/model.onnx")
                .with_tokenizer_url("http://127.0.0.1:9/tokenizer.json");
            let embedder = LocalEmbedder::new(config).unwrap();

            let mut events = Vec::new();
            let result = embedder.warm_up(&mut |p| events.push(p)).await;

            assert!(matches!(result, Err(LlmError::Network(_))));
            assert!(!events.contains(&WarmUpProgress::Load));
            assert!(!embedder.is_loaded());
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedder Factory
// ─────────────────────────────────────────────────────────────────────────────

/// Provider-agnostic description of the embedder to build.
///
/// The binary fills this from `[embedding]` config so this crate does not
/// depend on the config crate.
#[derive(Debug, Clone, Default)]
pub struct EmbedderSpec {
    /// Provider name: "local", "hashing", "mock", or "openai".
    pub provider: String,
    /// API key (required for "openai").
    pub openai_api_key: Option<String>,
    /// OpenAI model name.
    pub openai_model: Option<String>,
    /// OpenAI base URL override.
    pub openai_base_url: Option<String>,
    /// Directory holding (or receiving) the local ONNX model files.
    pub local_model_dir: Option<std::path::PathBuf>,
    /// Download URL override for the local ONNX model.
    pub local_model_url: Option<String>,
    /// Download URL override for the local tokenizer.json.
    pub local_tokenizer_url: Option<String>,
    /// Requested dimensions.
    pub dimensions: Option<usize>,
}

/// Build a [`SharedEmbedder`] from a spec.
///
/// "local" falls back to [`HashingEmbedder`] when the crate was built
/// without the `local-embeddings` feature.
pub fn build_embedder(spec: &EmbedderSpec) -> Result<SharedEmbedder> {
    let dims = spec.dimensions.unwrap_or(DEFAULT_DIMENSIONS);
    match spec.provider.as_str() {
        #[cfg(feature = "local-embeddings")]
        "local" => {
            let dir = spec
                .local_model_dir
                .clone()
                .or_else(default_local_model_dir)
                .ok_or_else(|| {
                    LlmError::Config(
                        "No data directory for the local embedding model. \
                         Set [embedding.local] model_dir."
                            .to_string(),
                    )
                })?;
            let mut config = local::LocalEmbedderConfig::new(dir).with_dimensions(dims);
            if let Some(ref url) = spec.local_model_url {
                config = config.with_model_url(url);
            }
            if let Some(ref url) = spec.local_tokenizer_url {
                config = config.with_tokenizer_url(url);
            }
            Ok(Arc::new(local::LocalEmbedder::new(config)?))
        }
        #[cfg(not(feature = "local-embeddings"))]
        "local" => {
            tracing::warn!(
                "Local embeddings requested but the 'local-embeddings' feature is not enabled. \
                 Falling back to the hashing embedder."
            );
            Ok(Arc::new(HashingEmbedder::new(dims)))
        }
        "hashing" => Ok(Arc::new(HashingEmbedder::new(dims))),
        "mock" => Ok(Arc::new(MockEmbedder::new(dims))),
        "openai" => {
            let api_key = spec.openai_api_key.as_deref().ok_or_else(|| {
                LlmError::Config(
                    "OpenAI embedding provider requires an API key. \
                     Set OPENAI_API_KEY or configure [embedding.openai] api_key."
                        .to_string(),
                )
            })?;
            let mut config = OpenAiEmbedderConfig::new(api_key);
            if let Some(ref model) = spec.openai_model {
                config = config.with_model(model);
            }
            if let Some(ref base_url) = spec.openai_base_url {
                config = config.with_base_url(base_url);
            }
            if let Some(dims) = spec.dimensions {
                config = config.with_dimensions(dims);
            }
            Ok(Arc::new(OpenAiEmbedder::new(config)?))
        }
        other => Err(LlmError::Config(format!(
            "Unknown embedding provider '{}'. Valid: local, hashing, mock, openai",
            other
        ))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Vector Math
// ─────────────────────────────────────────────────────────────────────────────

/// Scale `v` to unit length in place. Zero vectors are left alone.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Dot product. For unit vectors this is the cosine similarity.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity for vectors of any magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        dot(a, b) / (norm_a * norm_b)
    } else {
        0.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_mock_embedder() {
        let embedder = MockEmbedder::default();
        assert_eq!(embedder.dimensions(), 384);
        assert_eq!(embedder.name(), "mock");

        let embedding = embedder.embed("hello world").await.unwrap();
        assert_eq!(embedding.len(), 384);
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_mock_embedder_deterministic() {
        let embedder = MockEmbedder::default();

        let e1 = embedder.embed("test text").await.unwrap();
        let e2 = embedder.embed("test text").await.unwrap();
        let e3 = embedder.embed("other text").await.unwrap();

        assert_eq!(e1, e2);
        assert_ne!(e1, e3);
    }

    #[tokio::test]
    async fn test_hashing_embedder_tracks_overlap() {
        let embedder = HashingEmbedder::default();

        let skills = embedder
            .embed("Python, SQL and Power BI are my core skills")
            .await
            .unwrap();
        let question = embedder.embed("What are your skills?").await.unwrap();
        let unrelated = embedder.embed("weather forecast tomorrow").await.unwrap();

        assert!((norm(&skills) - 1.0).abs() < 0.001);
        assert!(dot(&skills, &question) > 0.2);
        assert!(dot(&skills, &question) > dot(&skills, &unrelated).abs());
    }

    #[tokio::test]
    async fn test_hashing_embedder_stopwords_only_is_zero() {
        let embedder = HashingEmbedder::new(16);
        let v = embedder.embed("what is the").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_hashing_tokens() {
        assert_eq!(
            HashingEmbedder::tokens("Tell me about your Projects!"),
            vec!["project".to_string()]
        );
        assert_eq!(HashingEmbedder::tokens("class"), vec!["class".to_string()]);
    }

    #[tokio::test]
    async fn test_embed_batch_preserves_order() {
        let embedder = MockEmbedder::new(8);

        let batch = embedder.embed_batch(&["one", "two"]).await.unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], embedder.embed("two").await.unwrap());
    }

    #[tokio::test]
    async fn test_default_warm_up_is_noop() {
        let mut events = Vec::new();
        let result = HashingEmbedder::default()
            .warm_up(&mut |p| events.push(p))
            .await;

        assert!(result.is_ok());
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_download_model_file_reports_progress() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/onnx/model.onnx"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("models").join("model.onnx");
        let mut events = Vec::new();

        let written = download_model_file(
            &Client::new(),
            &format!("{}/onnx/model.onnx", server.uri()),
            &dest,
            "model.onnx",
            &mut |p| events.push(p),
        )
        .await
        .unwrap();

        assert_eq!(written, 4096);
        assert_eq!(std::fs::read(&dest).unwrap(), vec![7u8; 4096]);
        assert!(!dest.with_extension("part").exists());
        assert_eq!(
            events.first(),
            Some(&WarmUpProgress::Download {
                file: "model.onnx",
                received: 0,
                total: Some(4096),
            })
        );
        assert_eq!(
            events.last(),
            Some(&WarmUpProgress::Download {
                file: "model.onnx",
                received: 4096,
                total: Some(4096),
            })
        );
    }

    #[tokio::test]
    async fn test_download_model_file_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("tokenizer.json");

        let result = download_model_file(
            &Client::new(),
            &format!("{}/tokenizer.json", server.uri()),
            &dest,
            "tokenizer.json",
            &mut |_| {},
        )
        .await;

        assert!(matches!(result, Err(LlmError::Backend(_))));
        assert!(!dest.exists());
    }

    #[cfg(not(feature = "local-embeddings"))]
    #[test]
    fn test_local_provider_without_feature_falls_back() {
        let spec = EmbedderSpec {
            provider: "local".to_string(),
            ..Default::default()
        };
        let embedder = build_embedder(&spec).unwrap();
        assert_eq!(embedder.name(), "hashing");
        assert_eq!(embedder.dimensions(), DEFAULT_DIMENSIONS);
    }

    #[cfg(feature = "local-embeddings")]
    #[test]
    fn test_local_provider_builds_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let spec = EmbedderSpec {
            provider: "local".to_string(),
            local_model_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let embedder = build_embedder(&spec).unwrap();
        assert_eq!(embedder.name(), "local");
        assert!(!dir.path().join("model.onnx").exists());
    }

    #[test]
    fn test_build_embedder() {
        let spec = EmbedderSpec {
            provider: "hashing".to_string(),
            dimensions: Some(64),
            ..Default::default()
        };
        let embedder = build_embedder(&spec).unwrap();
        assert_eq!(embedder.name(), "hashing");
        assert_eq!(embedder.dimensions(), 64);

        let missing_key = EmbedderSpec {
            provider: "openai".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            build_embedder(&missing_key),
            Err(LlmError::Config(_))
        ));

        let unknown = EmbedderSpec {
            provider: "word2vec".to_string(),
            ..Default::default()
        };
        assert!(build_embedder(&unknown).is_err());
    }

    #[test]
    fn test_openai_embedder_config_builder() {
        let config = OpenAiEmbedderConfig::new("key")
            .with_base_url("http://custom.api")
            .with_model("text-embedding-3-large")
            .with_dimensions(384);

        assert_eq!(config.base_url, "http://custom.api");
        assert_eq!(config.model, "text-embedding-3-large");

        let embedder = OpenAiEmbedder::new(config).unwrap();
        assert_eq!(embedder.dimensions(), 384);
        assert_eq!(embedder.embeddings_url(), "http://custom.api/embeddings");
    }

    #[test]
    fn test_vector_math() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((dot(&v, &v) - 1.0).abs() < 1e-6);

        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &[2.0, 0.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&a, &[0.0, 1.0, 0.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }
}
