use std::sync::Arc;

use cite_llm::LlmProvider;

use crate::corpus::Corpus;
use crate::embedder::Embedder;
use crate::error::{RagError, Result};
use crate::handle::IndexHandle;
use crate::index::FlatIndex;
use crate::types::RetrievalResult;

/// Embeds queries and joins index hits with their passages.
pub struct Retriever<P> {
    embedder: Arc<Embedder<P>>,
}

impl<P: LlmProvider> Retriever<P> {
    #[must_use]
    pub fn new(embedder: Arc<Embedder<P>>) -> Self {
        Self { embedder }
    }

    /// Top-`k` passages for `query`, nearest first, in index order.
    ///
    /// An empty index yields an empty result without contacting the embedding service.
    ///
    /// # Errors
    ///
    /// - `RagError::EmptyInput` for a blank query.
    /// - `RagError::InvalidConfig` for `k == 0`.
    /// - `RagError::CorpusIndexMismatch` when the index and corpus sizes differ.
    /// - Any embedding error, see [`Embedder::embed`].
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        index: &FlatIndex,
        corpus: &Corpus,
    ) -> Result<Vec<RetrievalResult>> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyInput("query is blank"));
        }
        if k == 0 {
            return Err(RagError::InvalidConfig("k must be positive".into()));
        }
        if index.len() != corpus.len() {
            tracing::error!(
                index = index.len(),
                corpus = corpus.len(),
                "index and corpus out of sync"
            );
            return Err(RagError::CorpusIndexMismatch {
                index: index.len(),
                corpus: corpus.len(),
            });
        }
        if index.is_empty() {
            tracing::debug!("empty index, nothing to retrieve");
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        let hits = index.search(&query_vector, k)?;

        let results: Vec<RetrievalResult> = hits
            .into_iter()
            .filter_map(|hit| {
                corpus.get(hit.id).map(|passage| RetrievalResult {
                    passage: passage.clone(),
                    distance: hit.distance,
                })
            })
            .collect();
        tracing::debug!(k, hits = results.len(), "retrieved passages");
        Ok(results)
    }

    /// Retrieve against the generation currently published in `handle`.
    ///
    /// # Errors
    ///
    /// Returns `RagError::NotIngested` if nothing has been published, otherwise as
    /// [`retrieve`](Self::retrieve).
    pub async fn retrieve_current(
        &self,
        query: &str,
        k: usize,
        handle: &IndexHandle,
    ) -> Result<Vec<RetrievalResult>> {
        let snapshot = handle.snapshot().ok_or(RagError::NotIngested)?;
        self.retrieve(query, k, &snapshot.index, &snapshot.corpus)
            .await
    }
}
