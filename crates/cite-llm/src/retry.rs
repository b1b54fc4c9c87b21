use std::future::Future;
use std::time::Duration;

use crate::error::LlmError;

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Bounded exponential backoff applied to transient provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (zero-based), capped at one minute.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// Parse the `Retry-After` header value as seconds, falling back to the policy backoff.
pub(crate) fn retry_delay(
    response: &reqwest::Response,
    policy: &RetryPolicy,
    attempt: u32,
) -> Duration {
    if let Some(val) = response.headers().get("retry-after")
        && let Ok(s) = val.to_str()
        && let Ok(secs) = s.parse::<u64>()
    {
        return Duration::from_secs(secs).min(MAX_BACKOFF);
    }
    policy.delay_for(attempt)
}

/// Send an HTTP request, retrying on 429 responses according to `policy`.
///
/// `f` must return a `reqwest::Response`. Returns the first non-429 `Response` for further
/// processing by the caller.
///
/// # Errors
///
/// Returns `LlmError::RateLimited` if all attempts are exhausted, or the underlying
/// `reqwest::Error` wrapped as `LlmError::Http` for other failures.
pub(crate) async fn send_with_retry<F, Fut>(
    provider_name: &str,
    policy: &RetryPolicy,
    mut f: F,
) -> Result<reqwest::Response, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..=policy.max_retries {
        let response = f().await.map_err(LlmError::Http)?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            if attempt == policy.max_retries {
                return Err(LlmError::RateLimited);
            }
            let delay = retry_delay(&response, policy, attempt);
            tracing::warn!(
                provider = provider_name,
                delay_ms = delay.as_millis(),
                attempt = attempt + 1,
                max_retries = policy.max_retries,
                "rate limited, retrying"
            );
            tokio::time::sleep(delay).await;
            continue;
        }

        return Ok(response);
    }

    Err(LlmError::RateLimited)
}

/// Run `f` until it succeeds, fails permanently, or the retry budget is spent.
///
/// Only errors for which [`LlmError::is_transient`] holds are retried.
///
/// # Errors
///
/// Returns the last error produced by `f`.
pub async fn with_backoff<T, F, Fut>(
    operation: &str,
    policy: &RetryPolicy,
    mut f: F,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    operation,
                    error = %e,
                    delay_ms = delay.as_millis(),
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
