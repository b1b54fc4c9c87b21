mod env;
mod types;


pub use types::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use cite_llm::retry::RetryPolicy;
use cite_rag::ChunkerConfig;

use crate::vault::{OPENAI_KEY_VARS, env_secret};

impl Config {
    /// Load configuration from a TOML file with env var overrides and secrets.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.resolve_secrets();
        Ok(config)
    }

    /// Read API keys from the environment into redacting wrappers.
    pub fn resolve_secrets(&mut self) {
        self.secrets.openai_api_key = env_secret(&OPENAI_KEY_VARS);
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.chunker_config()
            .validate()
            .context("invalid [chunking] section")?;
        if self.retrieval.top_k == 0 {
            bail!("retrieval.top_k must be positive");
        }
        if self.ingest.embed_concurrency == 0 {
            bail!("ingest.embed_concurrency must be positive");
        }
        if self.timeouts.embedding_seconds == 0 || self.timeouts.llm_seconds == 0 {
            bail!("timeouts must be positive");
        }
        if self.llm.base_url.trim().is_empty() {
            bail!("llm.base_url must not be empty");
        }
        if self.llm.model.trim().is_empty() || self.llm.embedding_model.trim().is_empty() {
            bail!("llm.model and llm.embedding_model must not be empty");
        }
        Ok(())
    }

    #[must_use]
    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            chunk_size: self.chunking.chunk_size,
            chunk_overlap: self.chunking.chunk_overlap,
        }
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
        }
    }

    #[must_use]
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.embedding_seconds)
    }

    #[must_use]
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.llm_seconds)
    }
}
