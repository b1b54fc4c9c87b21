//! Test-only mock provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message};

type EmbedFn = Arc<dyn Fn(&str) -> Vec<f32> + Send + Sync>;
type DelayFn = Arc<dyn Fn(&str) -> u64 + Send + Sync>;

#[derive(Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    pub default_response: String,
    pub embedding: Vec<f32>,
    embed_fn: Option<EmbedFn>,
    pub fail_chat: bool,
    pub fail_embed: bool,
    /// Embedding calls beyond this count fail with `LlmError::Unavailable`.
    pub fail_embed_after: Option<usize>,
    /// Milliseconds to sleep before returning a response.
    pub delay_ms: u64,
    embed_delay_fn: Option<DelayFn>,
    chat_calls: Arc<AtomicUsize>,
    embed_calls: Arc<AtomicUsize>,
    recorded: Arc<Mutex<Vec<Vec<Message>>>>,
    embedded: Arc<Mutex<Vec<String>>>,
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("default_response", &self.default_response)
            .field("fail_chat", &self.fail_chat)
            .field("fail_embed", &self.fail_embed)
            .finish_non_exhaustive()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            embedding: vec![0.0; 8],
            embed_fn: None,
            fail_chat: false,
            fail_embed: false,
            fail_embed_after: None,
            delay_ms: 0,
            embed_delay_fn: None,
            chat_calls: Arc::new(AtomicUsize::new(0)),
            embed_calls: Arc::new(AtomicUsize::new(0)),
            recorded: Arc::new(Mutex::new(Vec::new())),
            embedded: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            fail_embed: true,
            ..Self::default()
        }
    }

    /// Compute embeddings with `f` instead of returning the fixed `embedding`.
    #[must_use]
    pub fn with_embedder(mut self, f: impl Fn(&str) -> Vec<f32> + Send + Sync + 'static) -> Self {
        self.embed_fn = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Per-input embedding latency in milliseconds, overriding `delay_ms` for `embed`.
    #[must_use]
    pub fn with_embed_delay(mut self, f: impl Fn(&str) -> u64 + Send + Sync + 'static) -> Self {
        self.embed_delay_fn = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    /// Message lists passed to `chat`, in call order.
    #[must_use]
    pub fn recorded_messages(&self) -> Vec<Vec<Message>> {
        self.recorded.lock().unwrap().clone()
    }

    /// Texts of successful `embed` calls, in completion order.
    #[must_use]
    pub fn embedded_texts(&self) -> Vec<String> {
        self.embedded.lock().unwrap().clone()
    }
}

impl LlmProvider for MockProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail_chat {
            return Err(LlmError::Unavailable);
        }
        self.recorded.lock().unwrap().push(messages.to_vec());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let call = self.embed_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.embed_delay_fn.as_ref().map_or(self.delay_ms, |f| f(text));
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        if self.fail_embed || self.fail_embed_after.is_some_and(|n| call >= n) {
            return Err(LlmError::Unavailable);
        }
        self.embedded.lock().unwrap().push(text.to_owned());
        Ok(match &self.embed_fn {
            Some(f) => f(text),
            None => self.embedding.clone(),
        })
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}
