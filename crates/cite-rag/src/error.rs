//! Error types for cite-rag.

use cite_llm::LlmError;

use crate::document::DocumentError;

/// Errors produced by the retrieval pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// Chunking or retrieval parameters are unusable. Never retried.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Blank text rejected before reaching an external service.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// Embedding service failed after the retry budget was spent.
    #[error("embedding service unavailable: {0}")]
    ServiceUnavailable(#[source] LlmError),

    /// Generation service failed after the retry budget was spent.
    #[error("generation service unavailable: {0}")]
    GenerationUnavailable(#[source] LlmError),

    /// Embedding width changed within one process run or differs from the index.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Persisted index and corpus disagree; queries are refused until re-ingestion.
    #[error(
        "index holds {index} vectors but corpus holds {corpus} passages; re-run ingestion to rebuild both"
    )]
    CorpusIndexMismatch { index: usize, corpus: usize },

    /// No generation has been published yet.
    #[error("no index available; ingest documents first")]
    NotIngested,

    /// Index file failed structural validation.
    #[error("corrupt index file: {0}")]
    CorruptIndex(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document error: {0}")]
    Document(#[from] DocumentError),
}

impl RagError {
    /// Whether the caller may retry the operation unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable(_) | Self::GenerationUnavailable(_)
        )
    }
}

/// Result type alias using `RagError`.
pub type Result<T> = std::result::Result<T, RagError>;
