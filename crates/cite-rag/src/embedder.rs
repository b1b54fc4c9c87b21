//! Embedding client: blank-input validation, timeout, bounded retry, dimension pinning.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use cite_llm::retry::{RetryPolicy, with_backoff};
use cite_llm::{LlmError, LlmProvider};

use crate::error::{RagError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Embedder<P> {
    provider: Arc<P>,
    timeout: Duration,
    retry: RetryPolicy,
    // 0 until the first successful response.
    dimension: AtomicUsize,
}

impl<P: LlmProvider> Embedder<P> {
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            dimension: AtomicUsize::new(0),
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

    #[must_use]
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Pinned dimension, if any response has been seen.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        match self.dimension.load(Ordering::Acquire) {
            0 => None,
            n => Some(n),
        }
    }

    /// Pin the dimension ahead of the first call, e.g. from a loaded index.
    ///
    /// # Errors
    ///
    /// Returns `RagError::DimensionMismatch` if a different dimension is already pinned.
    pub fn pin_dimension(&self, dimension: usize) -> Result<()> {
        if dimension == 0 {
            return Ok(());
        }
        self.check_dimension(dimension)
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        match self
            .dimension
            .compare_exchange(0, actual, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                tracing::debug!(dimension = actual, "embedding dimension pinned");
                Ok(())
            }
            Err(expected) if expected == actual => Ok(()),
            Err(expected) => Err(RagError::DimensionMismatch { expected, actual }),
        }
    }

    /// Embed one text with a single logical call to the provider.
    ///
    /// # Errors
    ///
    /// - `RagError::EmptyInput` for blank text, before any external call.
    /// - `RagError::ServiceUnavailable` once retries are exhausted.
    /// - `RagError::DimensionMismatch` when the width differs from the pinned one.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RagError::EmptyInput("text to embed is blank"));
        }

        let vector = with_backoff("embed", &self.retry, move || async move {
            match tokio::time::timeout(self.timeout, self.provider.embed(text)).await {
                Ok(result) => result,
                Err(_) => Err(LlmError::Timeout(self.timeout.as_secs())),
            }
        })
        .await
        .map_err(|e| {
            tracing::error!(provider = self.provider.name(), error = %e, "embedding failed");
            RagError::ServiceUnavailable(e)
        })?;

        if vector.is_empty() {
            return Err(RagError::ServiceUnavailable(LlmError::EmptyResponse {
                provider: "embedding",
            }));
        }
        self.check_dimension(vector.len())?;
        tracing::debug!(chars = text.len(), dimension = vector.len(), "embedded");
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use cite_llm::mock::MockProvider;

    use super::*;

    fn embedder(mock: MockProvider) -> Embedder<MockProvider> {
        Embedder::new(Arc::new(mock)).with_retry(RetryPolicy::none())
    }

    #[tokio::test]
    async fn blank_text_rejected_without_call() {
        let mock = MockProvider::default();
        let e = embedder(mock.clone());
        assert!(matches!(e.embed("  \n").await, Err(RagError::EmptyInput(_))));
        assert_eq!(mock.embed_calls(), 0);
    }

    #[tokio::test]
    async fn first_response_pins_dimension() {
        let e = embedder(MockProvider::default());
        assert_eq!(e.dimension(), None);
        assert_eq!(e.embed("hello").await.unwrap().len(), 8);
        assert_eq!(e.dimension(), Some(8));
    }

    #[tokio::test]
    async fn later_width_change_is_fatal() {
        let mock = MockProvider::default().with_embedder(|t| vec![1.0; t.len()]);
        let e = embedder(mock);
        e.embed("abc").await.unwrap();
        let err = e.embed("abcd").await.unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 3,
                actual: 4
            }
        ));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn pin_dimension_conflict() {
        let e = embedder(MockProvider::default());
        e.pin_dimension(4).unwrap();
        assert!(matches!(
            e.embed("hello").await,
            Err(RagError::DimensionMismatch {
                expected: 4,
                actual: 8
            })
        ));
    }

    #[tokio::test]
    async fn provider_failure_is_service_unavailable() {
        let e = embedder(MockProvider::failing());
        let err = e.embed("hello").await.unwrap_err();
        assert!(matches!(err, RagError::ServiceUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let mut mock = MockProvider::default();
        mock.fail_embed = true;
        let e = Embedder::new(Arc::new(mock.clone())).with_retry(RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        });
        assert!(e.embed("hello").await.is_err());
        assert_eq!(mock.embed_calls(), 3);
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let e = embedder(MockProvider::default().with_delay(200))
            .with_timeout(Duration::from_millis(10));
        assert!(matches!(
            e.embed("hello").await,
            Err(RagError::ServiceUnavailable(LlmError::Timeout(_)))
        ));
    }
}
