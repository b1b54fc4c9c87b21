//! Ingestion coordinator: chunk, embed, build, persist, publish.

use std::path::PathBuf;
use std::sync::Arc;

use cite_llm::LlmProvider;
use futures::{StreamExt as _, TryStreamExt as _};
use tokio::sync::Mutex;

use crate::chunker::Chunker;
use crate::corpus::Corpus;
use crate::document::{self, Document, DocumentLoader};
use crate::embedder::Embedder;
use crate::error::{RagError, Result};
use crate::handle::{IndexHandle, Snapshot};
use crate::index::FlatIndex;
use crate::store::IndexStore;

const DEFAULT_CONCURRENCY: usize = 4;

/// Outcome of a committed ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub generation: String,
    pub documents: usize,
    pub passages: usize,
    pub dimension: usize,
}

pub struct IngestionPipeline<P> {
    chunker: Chunker,
    embedder: Arc<Embedder<P>>,
    store: IndexStore,
    handle: Arc<IndexHandle>,
    concurrency: usize,
    // One ingestion at a time within this process; `IndexStore::commit` locks across processes.
    lock: Mutex<()>,
}

impl<P: LlmProvider> IngestionPipeline<P> {
    #[must_use]
    pub fn new(
        chunker: Chunker,
        embedder: Arc<Embedder<P>>,
        store: IndexStore,
        handle: Arc<IndexHandle>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            handle,
            concurrency: DEFAULT_CONCURRENCY,
            lock: Mutex::new(()),
        }
    }

    /// Maximum number of embedding requests in flight. Clamped to at least 1.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn handle(&self) -> &Arc<IndexHandle> {
        &self.handle
    }

    /// Rebuild the index and corpus from `documents` and publish them.
    ///
    /// All-or-nothing: if any chunk fails to embed, nothing is written and the
    /// previously published generation stays in place.
    ///
    /// # Errors
    ///
    /// Returns the first embedding error, or an IO error while persisting.
    pub async fn ingest(&self, documents: Vec<Document>) -> Result<IngestReport> {
        let _guard = self.lock.lock().await;

        let chunks = self.chunker.split_documents(&documents);
        tracing::info!(
            documents = documents.len(),
            chunks = chunks.len(),
            concurrency = self.concurrency,
            "ingestion started"
        );

        // `buffered` yields in input order, so vector i always belongs to chunk i.
        let embedder = self.embedder.as_ref();
        let vectors: Vec<Vec<f32>> = futures::stream::iter(chunks.iter())
            .map(move |chunk| embedder.embed(&chunk.text))
            .buffered(self.concurrency)
            .try_collect()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "ingestion aborted, nothing committed"))?;

        let index = FlatIndex::from_vectors(&vectors)?;
        let corpus = Corpus::from_chunks(chunks);
        if index.len() != corpus.len() {
            return Err(RagError::CorpusIndexMismatch {
                index: index.len(),
                corpus: corpus.len(),
            });
        }
        let passages = corpus.len();
        let dimension = index.dimension();

        let store = self.store.clone();
        let (generation, index, corpus) = tokio::task::spawn_blocking(move || {
            let generation = store.commit(&index, &corpus)?;
            Ok::<_, RagError>((generation, index, corpus))
        })
        .await
        .map_err(|e| RagError::Io(std::io::Error::other(e)))??;

        self.handle.publish(Snapshot {
            generation: Some(generation.clone()),
            index,
            corpus,
        });

        tracing::info!(
            generation = %generation,
            passages,
            dimension,
            "ingestion committed"
        );
        Ok(IngestReport {
            generation,
            documents: documents.len(),
            passages,
            dimension,
        })
    }

    /// Load every supported file under `paths` and ingest them as one batch.
    ///
    /// # Errors
    ///
    /// Returns document loading errors, or any error from [`ingest`](Self::ingest).
    pub async fn load_and_ingest(
        &self,
        paths: &[PathBuf],
        loaders: &[Box<dyn DocumentLoader>],
    ) -> Result<IngestReport> {
        let documents = document::load_all(paths, loaders).await?;
        self.ingest(documents).await
    }
}
