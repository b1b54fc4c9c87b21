//! Query path: retrieve, then synthesize, against one pinned snapshot.

use std::sync::Arc;

use cite_llm::LlmProvider;

use crate::citation::CitationReport;
use crate::error::{RagError, Result};
use crate::handle::IndexHandle;
use crate::retriever::Retriever;
use crate::synthesizer::Synthesizer;
use crate::types::RetrievalResult;

pub const DEFAULT_TOP_K: usize = 8;

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Retrieved passages in the order the answer's `[i]` markers refer to.
    pub sources: Vec<RetrievalResult>,
    pub citations: CitationReport,
}

pub struct QueryEngine<P> {
    retriever: Retriever<P>,
    synthesizer: Synthesizer<P>,
    handle: Arc<IndexHandle>,
    top_k: usize,
}

impl<P: LlmProvider> QueryEngine<P> {
    #[must_use]
    pub fn new(
        retriever: Retriever<P>,
        synthesizer: Synthesizer<P>,
        handle: Arc<IndexHandle>,
    ) -> Self {
        Self {
            retriever,
            synthesizer,
            handle,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn handle(&self) -> &Arc<IndexHandle> {
        &self.handle
    }

    /// Answer `query` using the top `k` passages (the configured default when `None`).
    ///
    /// # Errors
    ///
    /// Returns `RagError::NotIngested` before the first publish, otherwise any
    /// retrieval or generation error.
    pub async fn ask(&self, query: &str, k: Option<usize>) -> Result<Answer> {
        let k = k.unwrap_or(self.top_k);
        let snapshot = self.handle.snapshot().ok_or(RagError::NotIngested)?;

        let sources = self
            .retriever
            .retrieve(query, k, &snapshot.index, &snapshot.corpus)
            .await?;
        let text = self.synthesizer.synthesize(query, &sources).await?;

        let citations = CitationReport::analyze(&text, sources.len());
        citations.log();
        Ok(Answer {
            text,
            sources,
            citations,
        })
    }
}
