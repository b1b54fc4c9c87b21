//! Citation-constrained prompt assembly and generation.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use cite_llm::retry::{RetryPolicy, with_backoff};
use cite_llm::{LlmError, LlmProvider, Message};

use crate::error::{RagError, Result};
use crate::types::RetrievalResult;

/// Answer returned when the context cannot support one.
pub const REFUSAL: &str = "I don't know";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Render the grounded prompt. Passages are numbered by their position in `retrieved`.
#[must_use]
pub fn build_prompt(query: &str, retrieved: &[RetrievalResult]) -> String {
    let mut prompt = String::from(
        "You are a factual assistant.\n\n\
         Answer the question using ONLY the context below.\n\
         Every factual sentence MUST include a citation like [0], [1], etc.\n",
    );
    let _ = writeln!(
        prompt,
        "If the answer is not present, say \"{REFUSAL}\".\n\nContext:"
    );
    for (i, r) in retrieved.iter().enumerate() {
        let _ = write!(prompt, "[{i}] {}\n\n", r.passage.text);
    }
    let _ = write!(prompt, "Question:\n{query}");
    prompt
}

pub struct Synthesizer<P> {
    provider: Arc<P>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl<P: LlmProvider> Synthesizer<P> {
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Generate an answer to `query` grounded in `retrieved`.
    ///
    /// With nothing retrieved the refusal is returned and the provider is not called.
    ///
    /// # Errors
    ///
    /// Returns `RagError::GenerationUnavailable` when generation fails after retries.
    pub async fn synthesize(&self, query: &str, retrieved: &[RetrievalResult]) -> Result<String> {
        if retrieved.is_empty() {
            tracing::debug!("no context retrieved, refusing");
            return Ok(REFUSAL.to_owned());
        }

        let messages = [Message::user(build_prompt(query, retrieved))];
        let messages = &messages[..];
        let answer = with_backoff("generate", &self.retry, move || async move {
            match tokio::time::timeout(self.timeout, self.provider.chat(messages)).await {
                Ok(result) => result,
                Err(_) => Err(LlmError::Timeout(self.timeout.as_secs())),
            }
        })
        .await
        .map_err(|e| {
            tracing::error!(provider = self.provider.name(), error = %e, "generation failed");
            RagError::GenerationUnavailable(e)
        })?;

        tracing::debug!(
            passages = retrieved.len(),
            answer_chars = answer.len(),
            "answer generated"
        );
        Ok(answer)
    }
}
