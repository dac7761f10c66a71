//! Builds the response engines from configuration.

use anyhow::{Context as _, Result};
use tracing::{info, warn};

use folio_config::{
    ConfigError, EmbeddingProvider, FolioConfig, FuzzySection, GeneratorBackend, GeneratorSection,
    MatcherSection, SessionSection, resolve_api_key,
};
use folio_llm::{
    EmbedderSpec, OpenAiBackend, OpenAiConfig, SharedBackend, SharedEmbedder, build_embedder,
};
use folio_matcher::{FuzzyConfig, KeywordMatcher, KnowledgeBase, MatcherConfig};
use folio_retrieval::{
    Document, GeneratorSettings, RetrieverConfig, SemanticRetriever, builtin_documents,
    load_documents,
};
use folio_session::{SessionStore, StoreConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Keyword Matcher
// ─────────────────────────────────────────────────────────────────────────────

pub fn fuzzy_config(section: &FuzzySection) -> FuzzyConfig {
    FuzzyConfig {
        short_word_len: section.short_word_len,
        substring_ratio: section.substring_ratio,
        short_typo_len: section.short_typo_len,
        short_typo_distance: section.short_typo_distance,
        long_typo_distance: section.long_typo_distance,
        synonym_min_len: section.synonym_min_len,
    }
}

pub fn matcher_config(section: &MatcherSection) -> MatcherConfig {
    MatcherConfig::new()
        .with_fuzzy(fuzzy_config(&section.fuzzy))
        .with_fusion_ratio(section.fusion_ratio)
        .with_min_topical_score(section.min_topical_score)
        .with_max_suggestions(section.max_suggestions)
        .with_memory(section.memory)
}

/// Load the knowledge base named in config, or the built-in one.
pub fn build_matcher(config: &FolioConfig, seed: Option<u64>) -> Result<KeywordMatcher> {
    let section = config.matcher();
    let kb = match section.knowledge_base {
        Some(ref path) => KnowledgeBase::load(path)
            .with_context(|| format!("loading knowledge base {}", path.display()))?,
        None => KnowledgeBase::builtin().context("loading built-in knowledge base")?,
    };
    info!(entries = kb.len(), "Knowledge base loaded");

    let matcher = KeywordMatcher::new(kb).with_config(matcher_config(&section));
    Ok(match seed {
        Some(seed) => matcher.with_seed(seed),
        None => matcher,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Semantic Retriever
// ─────────────────────────────────────────────────────────────────────────────

pub fn store_config(section: &SessionSection) -> StoreConfig {
    let config = StoreConfig::new()
        .with_max_entries(section.max_entries)
        .with_max_bytes(section.max_bytes);
    match section.ttl() {
        Some(ttl) => config.with_ttl(ttl),
        None => config.without_ttl(),
    }
}

pub fn retriever_config(config: &FolioConfig) -> RetrieverConfig {
    let retrieval = config.retrieval();
    let generator = config.generator();
    RetrieverConfig::default()
        .with_top_k(retrieval.top_k)
        .with_threshold(retrieval.threshold)
        .with_generator_enabled(generator.enabled)
        .with_generator(GeneratorSettings {
            model: generator.model.clone(),
            max_tokens: generator.max_tokens,
            temperature: generator.temperature,
        })
}

pub fn embedder_spec(config: &FolioConfig) -> Result<EmbedderSpec> {
    let section = config.embedding();
    let mut spec = EmbedderSpec {
        provider: section.provider.as_str().to_string(),
        dimensions: section.dimensions,
        ..Default::default()
    };

    if section.provider == EmbeddingProvider::OpenAi {
        let openai = section.openai.clone().unwrap_or_default();
        let key = resolve_api_key("OPENAI_API_KEY", openai.api_key.as_deref()).ok_or_else(|| {
            ConfigError::ApiKeyNotFound {
                provider: "embedding.openai".to_string(),
                env_var: "OPENAI_API_KEY".to_string(),
            }
        })?;
        info!(source = %key.source, "Resolved embedding API key");
        spec.openai_api_key = Some(key.value);
        spec.openai_model = Some(openai.model);
        spec.openai_base_url = Some(openai.base_url);
    }
    if let Some(local) = section.local {
        spec.local_model_dir = local.model_dir;
        spec.local_model_url = local.model_url;
        spec.local_tokenizer_url = local.tokenizer_url;
    }
    Ok(spec)
}

/// Build the generation backend, or `None` when generation is off.
///
/// A hosted backend without an API key is treated like an unreachable one:
/// the retriever falls back to templates.
pub fn build_backend(section: &GeneratorSection) -> Result<Option<SharedBackend>> {
    if !section.enabled {
        return Ok(None);
    }

    let key = resolve_api_key(section.backend.env_var(), section.api_key.as_deref());
    let mut openai = match section.backend {
        GeneratorBackend::OpenAi => match key {
            Some(ref key) => OpenAiConfig::openai(key.value.clone()),
            None => {
                warn!(
                    backend = %section.backend,
                    env_var = section.backend.env_var(),
                    "No API key for generator backend, answers will use templates"
                );
                return Ok(None);
            }
        },
        GeneratorBackend::Ollama => OpenAiConfig::ollama(),
        GeneratorBackend::Custom => {
            let url = section.base_url.clone().ok_or_else(|| ConfigError::InvalidValue {
                field: "generator.base_url".to_string(),
                reason: "required for the custom backend".to_string(),
            })?;
            OpenAiConfig::custom(url)
        }
    };

    openai = openai.with_model(section.model.clone());
    if let Some(ref url) = section.base_url {
        openai = openai.with_base_url(url.clone());
    }
    if section.backend != GeneratorBackend::OpenAi
        && let Some(key) = key
    {
        openai = openai.with_api_key(key.value);
    }

    Ok(Some(OpenAiBackend::shared(openai)?))
}

/// Documents named in config, or the built-in set.
pub fn documents(config: &FolioConfig) -> Result<Vec<Document>> {
    match config.retrieval().documents {
        Some(ref path) => {
            load_documents(path).with_context(|| format!("loading documents {}", path.display()))
        }
        None => builtin_documents().context("loading built-in documents"),
    }
}

/// Assemble an uninitialized retriever.
pub fn build_retriever(config: &FolioConfig, session: SessionStore) -> Result<SemanticRetriever> {
    let embedder: SharedEmbedder = build_embedder(&embedder_spec(config)?)?;
    let retriever = SemanticRetriever::new(embedder, session).with_config(retriever_config(config));
    Ok(match build_backend(&config.generator())? {
        Some(backend) => retriever.with_backend(backend),
        None => retriever,
    })
}
