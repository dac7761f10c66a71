//! End-to-end retriever behaviour with scripted embedders and backends.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use folio_llm::{
    Embedder, HashingEmbedder, LlmError, MockBackend, MockEmbedder, SharedBackend,
};
use folio_retrieval::{
    CACHE_KEY, Document, FAILURE_MESSAGE, GeneratorMode, NO_CONTEXT_ANSWER, RetrievalError,
    RetrieverConfig, SemanticRetriever, builtin_documents,
};
use folio_session::{SessionStore, StoreConfig};

/// Counts calls and returns fixed vectors per text, a unit basis vector by
/// default.
struct ScriptedEmbedder {
    calls: AtomicUsize,
    vectors: HashMap<String, Vec<f32>>,
    fail_on: Option<String>,
}

impl ScriptedEmbedder {
    fn new(vectors: &[(&str, [f32; 3])]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            vectors: vectors
                .iter()
                .map(|(text, v)| (text.to_string(), v.to_vec()))
                .collect(),
            fail_on: None,
        }
    }

    fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for ScriptedEmbedder {
    async fn embed(&self, text: &str) -> folio_llm::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.as_deref() == Some(text) {
            return Err(LlmError::Network("embedder offline".to_string()));
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![1.0, 0.0, 0.0]))
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn docs() -> Vec<Document> {
    vec![
        Document::new("p1", "Project one.").with_topic("projects"),
        Document::new("e1", "Experience.").with_topic("experience"),
        Document::new("p2", "Project two.").with_topic("projects"),
        Document::new("far", "Unrelated."),
    ]
}

fn scripted() -> ScriptedEmbedder {
    ScriptedEmbedder::new(&[
        ("Project one.", [0.96, 0.28, 0.0]),
        ("Experience.", [0.8, 0.6, 0.0]),
        ("Project two.", [0.6, 0.8, 0.0]),
        ("Unrelated.", [0.0, 0.0, 1.0]),
        ("projects?", [1.0, 0.0, 0.0]),
        ("nothing", [0.0, -1.0, 0.0]),
    ])
}

#[tokio::test]
async fn second_init_reuses_session_cache() {
    let session = SessionStore::default();
    let embedder = Arc::new(scripted());

    let mut first = SemanticRetriever::new(embedder.clone(), session.clone());
    first.init(docs(), |_| {}).await.unwrap();
    assert_eq!(embedder.calls(), 4);
    assert!(session.contains(CACHE_KEY).await);

    let mut second = SemanticRetriever::new(embedder.clone(), session.clone());
    second.init(docs(), |_| {}).await.unwrap();
    assert_eq!(embedder.calls(), 4);

    let a = first.ask("projects?").await.unwrap();
    let b = second.ask("projects?").await.unwrap();
    assert_eq!(a.answer, b.answer);
    assert_eq!(a.sources, b.sources);
}

#[tokio::test]
async fn changed_documents_invalidate_cache() {
    let session = SessionStore::default();
    let embedder = Arc::new(scripted());

    let mut retriever = SemanticRetriever::new(embedder.clone(), session.clone());
    retriever.init(docs(), |_| {}).await.unwrap();

    let mut changed = docs();
    changed[3].content = "Something unrelated.".to_string();
    retriever.init(changed, |_| {}).await.unwrap();

    assert_eq!(embedder.calls(), 8);
}

#[tokio::test]
async fn full_quota_only_skips_caching() {
    let session = SessionStore::new(StoreConfig::new().with_max_bytes(16));
    let embedder = Arc::new(scripted());

    let mut retriever = SemanticRetriever::new(embedder.clone(), session.clone());
    retriever.init(docs(), |_| {}).await.unwrap();

    assert!(!session.contains(CACHE_KEY).await);
    assert!(retriever.ask("projects?").await.is_ok());
}

#[tokio::test]
async fn template_answer_groups_top_topic() {
    let mut retriever = SemanticRetriever::new(Arc::new(scripted()), SessionStore::default());
    let mode = retriever.init(docs(), |_| {}).await.unwrap();
    assert_eq!(mode, GeneratorMode::Template);

    let answer = retriever.ask("projects?").await.unwrap();

    let ids: Vec<&str> = answer.sources.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "e1", "p2"]);
    assert_eq!(answer.sources[0].score, 0.96);
    assert_eq!(
        answer.answer,
        "Here are some of my key projects:\n\nProject one.\n\nProject two."
    );
    assert_eq!(answer.mode, GeneratorMode::Template);
    let t = answer.timing;
    assert!((t.total_ms - (t.embed_ms + t.retrieve_ms + t.generate_ms)).abs() < 1e-9);
}

#[tokio::test]
async fn threshold_excludes_weak_matches() {
    let config = RetrieverConfig::default().with_threshold(0.7).with_top_k(5);
    let mut retriever =
        SemanticRetriever::new(Arc::new(scripted()), SessionStore::default()).with_config(config);
    retriever.init(docs(), |_| {}).await.unwrap();

    let answer = retriever.ask("projects?").await.unwrap();
    let ids: Vec<&str> = answer.sources.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "e1"]);

    let none = retriever.ask("nothing").await.unwrap();
    assert!(none.sources.is_empty());
    assert_eq!(none.answer, NO_CONTEXT_ANSWER);
}

#[tokio::test]
async fn llm_mode_sends_numbered_context() {
    let backend = Arc::new(MockBackend::with_text("  I built two projects.  "));
    let shared: SharedBackend = backend.clone();
    let mut retriever = SemanticRetriever::new(Arc::new(scripted()), SessionStore::default())
        .with_backend(shared);

    let mode = retriever.init(docs(), |_| {}).await.unwrap();
    assert_eq!(mode, GeneratorMode::Llm);

    let answer = retriever.ask("projects?").await.unwrap();
    assert_eq!(answer.answer, "I built two projects.");
    assert_eq!(answer.mode, GeneratorMode::Llm);

    let request = &backend.requests()[0];
    assert_eq!(request.max_tokens, 300);
    assert_eq!(
        request.messages[0].content,
        "Context:\n[1] Project one.\n\n[2] Experience.\n\n[3] Project two.\n\nQuestion: projects?"
    );
}

#[tokio::test]
async fn unreachable_backend_falls_back_to_templates() {
    let backend: SharedBackend = Arc::new(MockBackend::with_text("x").unhealthy());
    let mut retriever = SemanticRetriever::new(Arc::new(scripted()), SessionStore::default())
        .with_backend(backend);

    assert_eq!(
        retriever.init(docs(), |_| {}).await.unwrap(),
        GeneratorMode::Template
    );
}

#[tokio::test]
async fn generation_failure_becomes_apology() {
    let backend: SharedBackend = Arc::new(MockBackend::failing("model crashed"));
    let mut retriever = SemanticRetriever::new(Arc::new(scripted()), SessionStore::default())
        .with_backend(backend);
    retriever.init(docs(), |_| {}).await.unwrap();

    assert!(matches!(
        retriever.ask("projects?").await,
        Err(RetrievalError::Generation(_))
    ));

    let answer = retriever.respond("projects?").await;
    assert_eq!(answer.answer, FAILURE_MESSAGE);
    assert!(answer.sources.is_empty());
    assert_eq!(answer.mode, GeneratorMode::Llm);
}

#[tokio::test]
async fn embedding_failure_surfaces() {
    let embedder = Arc::new(scripted().failing_on("boom"));
    let mut retriever = SemanticRetriever::new(embedder, SessionStore::default());
    retriever.init(docs(), |_| {}).await.unwrap();

    assert!(matches!(
        retriever.ask("boom").await,
        Err(RetrievalError::Embedding(_))
    ));
    assert_eq!(retriever.respond("boom").await.answer, FAILURE_MESSAGE);
}

#[tokio::test]
async fn failed_indexing_leaves_retriever_not_ready() {
    let embedder = Arc::new(scripted().failing_on("Experience."));
    let mut retriever = SemanticRetriever::new(embedder, SessionStore::default());

    assert!(retriever.init(docs(), |_| {}).await.is_err());
    assert!(matches!(
        retriever.ask("projects?").await,
        Err(RetrievalError::NotReady)
    ));
}

#[tokio::test]
async fn builtin_documents_answer_skill_questions() {
    let mut retriever =
        SemanticRetriever::new(Arc::new(HashingEmbedder::default()), SessionStore::default());
    retriever.init(builtin_documents().unwrap(), |_| {}).await.unwrap();

    let answer = retriever.ask("What are your main technical skills?").await.unwrap();

    assert!(!answer.sources.is_empty());
    assert_eq!(answer.sources[0].metadata.topic.as_deref(), Some("skills"));
    assert!(answer.answer.starts_with("Technical skills") || answer.answer.starts_with("Here is an overview"));
}

#[tokio::test]
async fn mock_embedder_is_deterministic_end_to_end() {
    let run = || async {
        let mut r = SemanticRetriever::new(Arc::new(MockEmbedder::default()), SessionStore::default())
            .with_config(RetrieverConfig::default().with_threshold(-1.0));
        r.init(builtin_documents().unwrap(), |_| {}).await.unwrap();
        r.ask("Tell me about your projects").await.unwrap()
    };
    let (a, b) = (run().await, run().await);
    assert_eq!(a.answer, b.answer);
    assert_eq!(a.sources, b.sources);
}
