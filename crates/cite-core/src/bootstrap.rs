//! Application bootstrap: config resolution, provider and pipeline construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use cite_llm::LlmProvider;
use cite_llm::any::AnyProvider;
use cite_llm::ollama::OllamaProvider;
use cite_llm::openai::OpenAiProvider;
use cite_rag::document::{self, DocumentLoader};
use cite_rag::{
    Chunker, Embedder, IndexHandle, IndexStore, IngestionPipeline, QueryEngine, Retriever,
    Snapshot, Synthesizer,
};

use crate::config::{Config, ProviderKind};

/// Priority: `--config` flag > `CITE_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("CITE_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

/// Build the configured provider.
///
/// # Errors
///
/// Returns an error if the OpenAI key is missing or the HTTP client cannot be built.
pub fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    match config.llm.provider {
        ProviderKind::OpenAi => {
            let api_key = config
                .secrets
                .openai_api_key
                .as_ref()
                .context("CITE_OPENAI_API_KEY not found (OPENAI_API_KEY is also accepted)")?;
            let provider = OpenAiProvider::new(
                api_key.expose().to_owned(),
                config.llm.base_url.clone(),
                config.llm.model.clone(),
                config.llm.max_tokens,
                Some(config.llm.embedding_model.clone()),
            )
            .context("failed to build OpenAI client")?
            .with_rate_limit_policy(config.retry_policy());
            Ok(AnyProvider::OpenAi(provider))
        }
        ProviderKind::Ollama => Ok(AnyProvider::Ollama(OllamaProvider::new(
            &config.llm.base_url,
            config.llm.model.clone(),
            config.llm.embedding_model.clone(),
        ))),
    }
}

/// Summary of the published generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub data_dir: PathBuf,
    pub generation: Option<String>,
    pub passages: usize,
    pub vectors: usize,
    pub dimension: usize,
}

/// Read the published generation without constructing a provider.
///
/// # Errors
///
/// Returns an error if the generation exists but cannot be read.
pub fn read_status(config: &Config) -> anyhow::Result<Status> {
    let store = IndexStore::new(config.storage.data_dir.clone());
    let snapshot = store
        .load_current()
        .with_context(|| format!("failed to read index in {}", store.data_dir().display()))?;
    Ok(Status::from_snapshot(store.data_dir(), snapshot.as_ref()))
}

impl Status {
    fn from_snapshot(data_dir: &Path, snapshot: Option<&Snapshot>) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            generation: snapshot.and_then(|s| s.generation.clone()),
            passages: snapshot.map_or(0, |s| s.corpus.len()),
            vectors: snapshot.map_or(0, |s| s.index.len()),
            dimension: snapshot.map_or(0, |s| s.index.dimension()),
        }
    }
}

/// Everything a command needs, wired from one [`Config`].
pub struct App<P> {
    pub config: Config,
    pub store: IndexStore,
    pub handle: Arc<IndexHandle>,
    pub pipeline: IngestionPipeline<P>,
    pub engine: QueryEngine<P>,
}

impl<P: LlmProvider> App<P> {
    /// Validate `config` and open the published generation, if any.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid settings or an unreadable generation.
    pub fn build(config: Config, provider: P) -> anyhow::Result<Self> {
        config.validate()?;
        tracing::debug!(
            provider = provider.name(),
            data_dir = %config.storage.data_dir.display(),
            "building application"
        );

        let provider = Arc::new(provider);
        let store = IndexStore::new(config.storage.data_dir.clone());
        let handle = Arc::new(
            IndexHandle::open(&store)
                .with_context(|| format!("failed to open index in {}", store.data_dir().display()))?,
        );

        let embedder = Arc::new(
            Embedder::new(Arc::clone(&provider))
                .with_timeout(config.embedding_timeout())
                .with_retry(config.retry_policy()),
        );
        let pipeline = IngestionPipeline::new(
            Chunker::new(config.chunker_config())?,
            Arc::clone(&embedder),
            store.clone(),
            Arc::clone(&handle),
        )
        .with_concurrency(config.ingest.embed_concurrency);
        let synthesizer = Synthesizer::new(provider)
            .with_timeout(config.llm_timeout())
            .with_retry(config.retry_policy());
        let engine = QueryEngine::new(Retriever::new(embedder), synthesizer, Arc::clone(&handle))
            .with_top_k(config.retrieval.top_k);

        Ok(Self {
            config,
            store,
            handle,
            pipeline,
            engine,
        })
    }

    #[must_use]
    pub fn loaders(&self) -> Vec<Box<dyn DocumentLoader>> {
        document::default_loaders(self.config.ingest.max_file_size)
    }

    #[must_use]
    pub fn status(&self) -> Status {
        Status::from_snapshot(self.store.data_dir(), self.handle.snapshot().as_deref())
    }
}
