//! Answer generation from retrieved passages.
//!
//! Two modes. With a reachable language model the passages become prompt
//! context. Without one, answers are stitched together from the passages
//! themselves, which reads well enough for a curated document set.

use std::fmt;

use folio_llm::{CompletionRequest, Message, SharedBackend};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, RetrievalError};
use crate::store::ScoredDocument;

/// Reply when retrieval found nothing above the threshold.
pub const NO_CONTEXT_ANSWER: &str = "I don't have information about that in my knowledge base. Try asking about my projects, skills, experience, or education.";

/// System prompt for LLM mode.
pub const SYSTEM_PROMPT: &str = "You are answering questions about a data scientist's portfolio. Use ONLY the provided context. Be concise and direct. Write in first person where appropriate.";

/// Lead-in for merged template answers, by topic.
pub fn topic_intro(topic: &str) -> &'static str {
    match topic {
        "projects" => "Here are some of my key projects:\n\n",
        "skills" => "Here is an overview of my technical skills:\n\n",
        _ => "",
    }
}

/// How answers are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorMode {
    Llm,
    Template,
}

impl fmt::Display for GeneratorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorMode::Llm => write!(f, "llm"),
            GeneratorMode::Template => write!(f, "template"),
        }
    }
}

/// Whether a language model can be used. Decided once, at init.
#[derive(Clone)]
pub enum GeneratorCapability {
    Available(SharedBackend),
    Unavailable(String),
}

impl GeneratorCapability {
    /// Check `backend`. Never fails: every problem becomes `Unavailable`.
    pub async fn detect(backend: Option<SharedBackend>, enabled: bool) -> Self {
        let Some(backend) = backend else {
            return Self::Unavailable("no generator backend configured".to_string());
        };
        if !enabled {
            return Self::Unavailable("generator disabled".to_string());
        }
        match backend.health_check().await {
            Ok(()) => {
                info!(backend = backend.name(), "Generator backend available");
                Self::Available(backend)
            }
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "Generator backend unreachable, using templates");
                Self::Unavailable(e.to_string())
            }
        }
    }

    pub fn mode(&self) -> GeneratorMode {
        match self {
            Self::Available(_) => GeneratorMode::Llm,
            Self::Unavailable(_) => GeneratorMode::Template,
        }
    }
}

impl fmt::Debug for GeneratorCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(backend) => f.debug_tuple("Available").field(&backend.name()).finish(),
            Self::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
        }
    }
}

/// LLM request settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSettings {
    /// Sent as the request model; a backend configured with its own model
    /// overrides it.
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            max_tokens: 300,
            temperature: 0.3,
        }
    }
}

/// Produces an answer from a question and its retrieved passages.
#[derive(Debug, Clone)]
pub struct Generator {
    capability: GeneratorCapability,
    settings: GeneratorSettings,
}

impl Generator {
    pub fn new(capability: GeneratorCapability, settings: GeneratorSettings) -> Self {
        Self {
            capability,
            settings,
        }
    }

    pub fn mode(&self) -> GeneratorMode {
        self.capability.mode()
    }

    pub fn capability(&self) -> &GeneratorCapability {
        &self.capability
    }

    pub async fn generate(&self, question: &str, hits: &[ScoredDocument<'_>]) -> Result<String> {
        if hits.is_empty() {
            return Ok(NO_CONTEXT_ANSWER.to_string());
        }
        match &self.capability {
            GeneratorCapability::Available(backend) => {
                let request = build_request(question, hits, &self.settings);
                debug!(backend = backend.name(), passages = hits.len(), "Generating with LLM");
                let response = backend
                    .complete(request)
                    .await
                    .map_err(RetrievalError::Generation)?;
                Ok(response.text.trim().to_string())
            }
            GeneratorCapability::Unavailable(_) => Ok(template_answer(hits)),
        }
    }
}

/// Chat request carrying the passages as numbered context.
pub fn build_request(
    question: &str,
    hits: &[ScoredDocument<'_>],
    settings: &GeneratorSettings,
) -> CompletionRequest {
    let context = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("[{}] {}", i + 1, hit.document.content))
        .collect::<Vec<_>>()
        .join("\n\n");
    let user = format!("Context:\n{context}\n\nQuestion: {question}");

    CompletionRequest::new(
        settings.model.clone(),
        vec![Message::user(user)],
        settings.max_tokens,
    )
    .with_system(SYSTEM_PROMPT)
    .with_temperature(settings.temperature)
}

/// Answer built from the passages alone.
///
/// A single hit is returned as is. Otherwise only hits sharing the top hit's
/// topic are kept, so an experience passage never leaks into a projects
/// answer; several of them are merged under the topic's lead-in.
pub fn template_answer(hits: &[ScoredDocument<'_>]) -> String {
    let Some(top) = hits.first() else {
        return NO_CONTEXT_ANSWER.to_string();
    };
    if hits.len() == 1 {
        return top.document.content.clone();
    }

    let topic = top.document.topic();
    let same_topic: Vec<&str> = hits
        .iter()
        .filter(|hit| hit.document.topic() == topic)
        .map(|hit| hit.document.content.as_str())
        .collect();

    if same_topic.len() == 1 {
        return top.document.content.clone();
    }
    format!("{}{}", topic_intro(topic), same_topic.join("\n\n"))
}
