//! Chat-completion backend trait and a scripted mock.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{LlmError, Result};
use crate::types::{CompletionRequest, CompletionResponse, StopReason, Usage};

// ─────────────────────────────────────────────────────────────────────────────
// Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A generative model that turns a prompt into text.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Run one non-streaming completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Backend name, for logs and status output.
    fn name(&self) -> &str;

    /// Cheap reachability check. `Ok` means `complete` is worth attempting.
    async fn health_check(&self) -> Result<()>;
}

/// A backend that can be shared across threads.
pub type SharedBackend = Arc<dyn LlmBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────────────────

/// Scripted backend for tests and offline demos.
///
/// Responses are handed out in order; once they run out `complete` fails.
/// Every request is logged so tests can inspect the prompt that was sent.
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    responses: Mutex<VecDeque<Result<CompletionResponse>>>,
    request_log: Mutex<Vec<CompletionRequest>>,
    healthy: bool,
}

impl MockBackend {
    /// Create a mock backend with the given responses.
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            name: "mock".to_string(),
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            request_log: Mutex::new(Vec::new()),
            healthy: true,
        }
    }

    /// Create a mock backend with a single text response.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(vec![CompletionResponse::new(
            "mock_msg_1",
            "mock-model",
            text,
            StopReason::EndTurn,
            Usage::new(10, 20),
        )])
    }

    /// A backend whose next completion fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let backend = Self::new(Vec::new());
        backend
            .responses
            .lock()
            .push_back(Err(LlmError::Backend(message.into())));
        backend
    }

    /// Make `health_check` fail, as an unreachable server would.
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// All requests made so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.request_log.lock().clone()
    }

    /// Number of requests made.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().len()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.request_log.lock().push(request);

        self.responses.lock().pop_front().unwrap_or_else(|| {
            Err(LlmError::Backend(
                "MockBackend: no more responses available".to_string(),
            ))
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn health_check(&self) -> Result<()> {
        if self.healthy {
            Ok(())
        } else {
            Err(LlmError::Network("MockBackend: marked unhealthy".to_string()))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
