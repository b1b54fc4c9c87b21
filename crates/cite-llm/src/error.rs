#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limited")]
    RateLimited,

    #[error("provider unavailable")]
    Unavailable,

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("{provider} API request failed (status {status})")]
    Api { provider: &'static str, status: u16 },

    #[error("empty response from {provider}")]
    EmptyResponse { provider: &'static str },

    #[error("embedding not supported by {provider}")]
    EmbedUnsupported { provider: &'static str },

    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Whether retrying the same request may succeed.
    ///
    /// Network failures, timeouts and 5xx responses are transient. Client errors
    /// (bad key, bad model, malformed payload) are not. `RateLimited` is only
    /// produced once the per-request 429 budget is spent, so it is not retried again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Unavailable | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::RateLimited
            | Self::Json(_)
            | Self::EmptyResponse { .. }
            | Self::EmbedUnsupported { .. }
            | Self::Other(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_and_timeout_are_transient() {
        assert!(LlmError::Unavailable.is_transient());
        assert!(LlmError::Timeout(30).is_transient());
    }

    #[test]
    fn exhausted_rate_limit_is_permanent() {
        assert!(!LlmError::RateLimited.is_transient());
    }

    #[test]
    fn server_errors_are_transient_client_errors_are_not() {
        let server = LlmError::Api {
            provider: "openai",
            status: 503,
        };
        let client = LlmError::Api {
            provider: "openai",
            status: 401,
        };
        assert!(server.is_transient());
        assert!(!client.is_transient());
    }

    #[test]
    fn empty_response_is_permanent() {
        assert!(!LlmError::EmptyResponse { provider: "ollama" }.is_transient());
        assert!(!LlmError::Other("bad".into()).is_transient());
    }

    #[test]
    fn api_error_display() {
        let err = LlmError::Api {
            provider: "openai",
            status: 404,
        };
        assert_eq!(err.to_string(), "openai API request failed (status 404)");
    }
}
