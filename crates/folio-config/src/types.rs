//! Configuration types.
//!
//! Every section is optional in the file. A missing section means "use the
//! built-in defaults", and a present section may still omit any of its keys.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration, one value per loaded file or merged from several.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// Keyword matcher tuning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matcher: Option<MatcherSection>,

    /// Semantic retrieval tuning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval: Option<RetrievalSection>,

    /// Embedding provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<EmbeddingSection>,

    /// Text generation backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorSection>,

    /// Session store limits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionSection>,
}

impl FolioConfig {
    /// Empty config; every section falls back to defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: FolioConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one.
    ///
    /// A section present in `other` replaces the whole section here; keys are
    /// not merged individually.
    pub fn merge(&mut self, other: FolioConfig) {
        if other.matcher.is_some() {
            self.matcher = other.matcher;
        }
        if other.retrieval.is_some() {
            self.retrieval = other.retrieval;
        }
        if other.embedding.is_some() {
            self.embedding = other.embedding;
        }
        if other.generator.is_some() {
            self.generator = other.generator;
        }
        if other.session.is_some() {
            self.session = other.session;
        }
    }

    /// Matcher section, or its defaults.
    pub fn matcher(&self) -> MatcherSection {
        self.matcher.clone().unwrap_or_default()
    }

    /// Retrieval section, or its defaults.
    pub fn retrieval(&self) -> RetrievalSection {
        self.retrieval.clone().unwrap_or_default()
    }

    /// Embedding section, or its defaults.
    pub fn embedding(&self) -> EmbeddingSection {
        self.embedding.clone().unwrap_or_default()
    }

    /// Generator section, or its defaults.
    pub fn generator(&self) -> GeneratorSection {
        self.generator.clone().unwrap_or_default()
    }

    /// Session section, or its defaults.
    pub fn session(&self) -> SessionSection {
        self.session.clone().unwrap_or_default()
    }

    /// A copy with every section filled in, for display.
    pub fn effective(&self) -> FolioConfig {
        FolioConfig {
            matcher: Some(self.matcher()),
            retrieval: Some(self.retrieval()),
            embedding: Some(self.embedding()),
            generator: Some(self.generator()),
            session: Some(self.session()),
        }
    }

    /// Reject values that parse but cannot work.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref m) = self.matcher {
            if !(m.fusion_ratio > 0.0 && m.fusion_ratio <= 1.0) {
                return Err(invalid("matcher.fusion_ratio", "must be in (0, 1]"));
            }
            if !(0.0..=1.0).contains(&m.fuzzy.substring_ratio) {
                return Err(invalid("matcher.fuzzy.substring_ratio", "must be in [0, 1]"));
            }
        }
        if let Some(ref r) = self.retrieval {
            if r.top_k == 0 {
                return Err(invalid("retrieval.top_k", "must be at least 1"));
            }
            if !(-1.0..=1.0).contains(&r.threshold) {
                return Err(invalid("retrieval.threshold", "must be a cosine in [-1, 1]"));
            }
        }
        if let Some(ref e) = self.embedding
            && e.dimensions == Some(0)
        {
            return Err(invalid("embedding.dimensions", "must be positive"));
        }
        if let Some(ref s) = self.session
            && s.max_entries == 0
        {
            return Err(invalid("session.max_entries", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Matcher
// ─────────────────────────────────────────────────────────────────────────────

/// `[matcher]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherSection {
    /// Knowledge base file (TOML or JSON). Built-in when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_base: Option<PathBuf>,
    /// Runner-up must reach this fraction of the best score to be fused.
    pub fusion_ratio: f64,
    /// Minimum topical score for a match to count.
    pub min_topical_score: u32,
    /// Cap on suggestions after fusion.
    pub max_suggestions: usize,
    /// Prefix repeated topics with a refresher note.
    pub memory: bool,
    /// Fuzzy matching thresholds.
    pub fuzzy: FuzzySection,
}

impl Default for MatcherSection {
    fn default() -> Self {
        Self {
            knowledge_base: None,
            fusion_ratio: 0.7,
            min_topical_score: 2,
            max_suggestions: 4,
            memory: true,
            fuzzy: FuzzySection::default(),
        }
    }
}

/// `[matcher.fuzzy]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzySection {
    pub short_word_len: usize,
    pub substring_ratio: f64,
    pub short_typo_len: usize,
    pub short_typo_distance: usize,
    pub long_typo_distance: usize,
    pub synonym_min_len: usize,
}

impl Default for FuzzySection {
    fn default() -> Self {
        Self {
            short_word_len: 3,
            substring_ratio: 0.5,
            short_typo_len: 4,
            short_typo_distance: 1,
            long_typo_distance: 2,
            synonym_min_len: 3,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Retrieval
// ─────────────────────────────────────────────────────────────────────────────

/// `[retrieval]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSection {
    /// Document corpus (JSON). Built-in when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<PathBuf>,
    /// Number of documents to keep per query.
    pub top_k: usize,
    /// Minimum cosine similarity for a document to count as context.
    pub threshold: f32,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            documents: None,
            top_k: 3,
            threshold: 0.10,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedding
// ─────────────────────────────────────────────────────────────────────────────

/// Supported embedding providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Offline feature hashing (default).
    #[default]
    Hashing,
    /// all-MiniLM-L6-v2 on ONNX Runtime. Needs the `local-embeddings` build
    /// feature; without it the hashing embedder stands in.
    Local,
    /// Deterministic pseudo-random vectors, for tests.
    Mock,
    /// OpenAI-compatible `/embeddings` endpoint.
    #[serde(rename = "openai")]
    OpenAi,
}

impl EmbeddingProvider {
    /// Name understood by the embedder factory.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingProvider::Hashing => "hashing",
            EmbeddingProvider::Local => "local",
            EmbeddingProvider::Mock => "mock",
            EmbeddingProvider::OpenAi => "openai",
        }
    }
}

/// `[embedding]` section.
///
/// ```toml
/// [embedding]
/// provider = "openai"
///
/// [embedding.openai]
/// model = "text-embedding-3-small"
///
/// [embedding.local]
/// model_dir = "~/models/minilm"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    pub provider: EmbeddingProvider,
    /// Output dimensions. Default depends on provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai: Option<EmbeddingOpenAiSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<EmbeddingLocalSection>,
}

impl EmbeddingSection {
    /// Effective dimensions for the configured provider.
    pub fn effective_dimensions(&self) -> usize {
        if let Some(d) = self.dimensions {
            return d;
        }
        match self.provider {
            EmbeddingProvider::Hashing | EmbeddingProvider::Local | EmbeddingProvider::Mock => 384,
            EmbeddingProvider::OpenAi => 1536,
        }
    }

    /// Whether an API key is written into the file.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.openai.as_ref().is_some_and(|o| o.api_key.is_some())
    }
}

/// `[embedding.openai]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingOpenAiSection {
    pub model: String,
    pub base_url: String,
    /// API key (prefer the `OPENAI_API_KEY` env var).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for EmbeddingOpenAiSection {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
        }
    }
}

/// `[embedding.local]` section. Unset fields use the platform data dir and
/// the all-MiniLM-L6-v2 download URLs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingLocalSection {
    /// Directory holding `model.onnx` and `tokenizer.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenizer_url: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Generator
// ─────────────────────────────────────────────────────────────────────────────

/// Supported generation backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorBackend {
    #[serde(rename = "openai")]
    OpenAi,
    #[default]
    Ollama,
    Custom,
}

impl GeneratorBackend {
    /// Environment variable holding this backend's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            GeneratorBackend::OpenAi => "OPENAI_API_KEY",
            GeneratorBackend::Ollama | GeneratorBackend::Custom => "LLM_API_KEY",
        }
    }

    /// Whether the backend refuses requests without a key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, GeneratorBackend::OpenAi)
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            GeneratorBackend::OpenAi => "OpenAI",
            GeneratorBackend::Ollama => "Ollama",
            GeneratorBackend::Custom => "Custom",
        }
    }
}

impl std::fmt::Display for GeneratorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// `[generator]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSection {
    /// Try an LLM at all. When false answers are always templated.
    pub enabled: bool,
    pub backend: GeneratorBackend,
    pub model: String,
    /// Overrides the backend's default endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: GeneratorBackend::Ollama,
            model: "smollm2:135m".to_string(),
            base_url: None,
            api_key: None,
            max_tokens: 300,
            temperature: 0.3,
        }
    }
}

impl GeneratorSection {
    /// Whether an API key is written into the file.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// `[session]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub max_entries: usize,
    pub max_bytes: usize,
    /// Entry lifetime in seconds; 0 disables expiry.
    pub ttl_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            max_entries: 64,
            max_bytes: 5 * 1024 * 1024,
            ttl_secs: 0,
        }
    }
}

impl SessionSection {
    /// TTL as a duration, `None` when expiry is off.
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = FolioConfig::from_toml("").unwrap();
        assert!(config.matcher.is_none());

        let matcher = config.matcher();
        assert_eq!(matcher.fusion_ratio, 0.7);
        assert_eq!(matcher.min_topical_score, 2);
        assert_eq!(matcher.max_suggestions, 4);
        assert!(matcher.memory);
        assert_eq!(matcher.fuzzy.long_typo_distance, 2);

        assert_eq!(config.retrieval().top_k, 3);
        assert_eq!(config.embedding().provider, EmbeddingProvider::Hashing);
        assert_eq!(config.embedding().effective_dimensions(), 384);
        assert!(!config.generator().enabled);
        assert_eq!(config.session().max_bytes, 5_242_880);
        assert_eq!(config.session().ttl(), None);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = FolioConfig::from_toml(
            r#"
[matcher]
fusion_ratio = 0.8

[matcher.fuzzy]
long_typo_distance = 1
"#,
        )
        .unwrap();

        let matcher = config.matcher.unwrap();
        assert_eq!(matcher.fusion_ratio, 0.8);
        assert_eq!(matcher.max_suggestions, 4);
        assert_eq!(matcher.fuzzy.long_typo_distance, 1);
        assert_eq!(matcher.fuzzy.short_word_len, 3);
    }

    #[test]
    fn test_parse_full_config() {
        let config = FolioConfig::from_toml(
            r#"
[retrieval]
documents = "docs.json"
top_k = 5
threshold = 0.2

[embedding]
provider = "openai"

[embedding.openai]
model = "text-embedding-3-large"

[generator]
enabled = true
backend = "custom"
base_url = "http://localhost:8080/v1"
model = "qwen"

[session]
ttl_secs = 600
"#,
        )
        .unwrap();

        let retrieval = config.retrieval();
        assert_eq!(retrieval.documents, Some(PathBuf::from("docs.json")));
        assert_eq!(retrieval.top_k, 5);

        let embedding = config.embedding();
        assert_eq!(embedding.provider, EmbeddingProvider::OpenAi);
        assert_eq!(embedding.effective_dimensions(), 1536);
        assert_eq!(
            embedding.openai.unwrap().base_url,
            "https://api.openai.com/v1"
        );

        let generator = config.generator();
        assert!(generator.enabled);
        assert_eq!(generator.backend, GeneratorBackend::Custom);
        assert_eq!(generator.max_tokens, 300);

        assert_eq!(config.session().ttl(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_parse_local_embedding() {
        let config = FolioConfig::from_toml(
            r#"
[embedding]
provider = "local"

[embedding.local]
model_dir = "/tmp/minilm"
"#,
        )
        .unwrap();

        let embedding = config.embedding();
        assert_eq!(embedding.provider, EmbeddingProvider::Local);
        assert_eq!(embedding.provider.as_str(), "local");
        assert_eq!(embedding.effective_dimensions(), 384);
        let local = embedding.local.unwrap();
        assert_eq!(local.model_dir, Some(PathBuf::from("/tmp/minilm")));
        assert!(local.model_url.is_none());
    }

    #[test]
    fn test_merge_replaces_whole_sections() {
        let mut base = FolioConfig::from_toml(
            r#"
[matcher]
fusion_ratio = 0.9
max_suggestions = 2

[retrieval]
top_k = 7
"#,
        )
        .unwrap();
        let overlay = FolioConfig::from_toml(
            r#"
[matcher]
memory = false
"#,
        )
        .unwrap();

        base.merge(overlay);

        let matcher = base.matcher();
        assert!(!matcher.memory);
        // The overlay section replaced the base one, so its defaults win.
        assert_eq!(matcher.fusion_ratio, 0.7);
        assert_eq!(matcher.max_suggestions, 4);
        assert_eq!(base.retrieval().top_k, 7);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = FolioConfig::from_toml("[matcher]\nfusion_ratio = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "matcher.fusion_ratio"));

        let err = FolioConfig::from_toml("[retrieval]\ntop_k = 0").unwrap_err();
        assert!(err.to_string().contains("retrieval.top_k"));

        let err = FolioConfig::from_toml("[embedding]\ndimensions = 0").unwrap_err();
        assert!(err.to_string().contains("embedding.dimensions"));
    }

    #[test]
    fn test_unknown_provider_is_parse_error() {
        let err = FolioConfig::from_toml("[embedding]\nprovider = \"onnx\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_to_toml_roundtrips_sections() {
        let mut config = FolioConfig::new();
        config.generator = Some(GeneratorSection {
            enabled: true,
            ..Default::default()
        });

        let text = config.to_toml().unwrap();
        assert!(text.contains("[generator]"));
        assert!(!text.contains("[matcher]"));

        let parsed = FolioConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_effective_fills_every_section() {
        let config = FolioConfig::from_toml("[retrieval]\ntop_k = 6").unwrap();
        let effective = config.effective();

        assert_eq!(effective.retrieval().top_k, 6);
        assert!(effective.matcher.is_some());
        assert!(effective.session.is_some());
        assert!(effective.to_toml().unwrap().contains("[matcher.fuzzy]"));
    }

    #[test]
    fn test_backend_env_var() {
        assert_eq!(GeneratorBackend::OpenAi.env_var(), "OPENAI_API_KEY");
        assert_eq!(GeneratorBackend::Ollama.env_var(), "LLM_API_KEY");
        assert!(GeneratorBackend::OpenAi.requires_api_key());
        assert!(!GeneratorBackend::Custom.requires_api_key());
    }
}
