use std::path::PathBuf;

use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_pipeline();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("CITE_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid CITE_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("CITE_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("CITE_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("CITE_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("CITE_LLM_MAX_TOKENS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.llm.max_tokens = n;
        }
    }

    fn apply_env_overrides_pipeline(&mut self) {
        if let Ok(v) = std::env::var("CITE_CHUNK_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.chunking.chunk_size = n;
        }
        if let Ok(v) = std::env::var("CITE_CHUNK_OVERLAP")
            && let Ok(n) = v.parse::<usize>()
        {
            self.chunking.chunk_overlap = n;
        }
        if let Ok(v) = std::env::var("CITE_TOP_K")
            && let Ok(n) = v.parse::<usize>()
        {
            self.retrieval.top_k = n;
        }
        if let Ok(v) = std::env::var("CITE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("CITE_EMBED_CONCURRENCY")
            && let Ok(n) = v.parse::<usize>()
        {
            self.ingest.embed_concurrency = n;
        }
        if let Ok(v) = std::env::var("CITE_MAX_FILE_SIZE")
            && let Ok(n) = v.parse::<u64>()
        {
            self.ingest.max_file_size = n;
        }
        if let Ok(v) = std::env::var("CITE_TIMEOUT_EMBEDDING")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.embedding_seconds = secs;
        }
        if let Ok(v) = std::env::var("CITE_TIMEOUT_LLM")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.llm_seconds = secs;
        }
        if let Ok(v) = std::env::var("CITE_RETRY_MAX")
            && let Ok(n) = v.parse::<u32>()
        {
            self.retry.max_retries = n;
        }
        if let Ok(v) = std::env::var("CITE_RETRY_BASE_DELAY_MS")
            && let Ok(ms) = v.parse::<u64>()
        {
            self.retry.base_delay_ms = ms;
        }
        if let Ok(v) = std::env::var("CITE_LOG_FILE") {
            self.logging.file = if v.is_empty() {
                None
            } else {
                Some(PathBuf::from(v))
            };
        }
    }
}
