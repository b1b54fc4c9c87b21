//! Fixed-width sliding-window chunking over Unicode scalar values.

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{RagError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

impl ChunkerConfig {
    /// # Errors
    ///
    /// Returns `RagError::InvalidConfig` when `chunk_size` is zero or the overlap
    /// does not leave room for the window to advance.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::InvalidConfig("chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// A chunk of a document before it is assigned a passage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// # Errors
    ///
    /// Returns `RagError::InvalidConfig` for an unusable window, see [`ChunkerConfig::validate`].
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<String> {
        windows(text, self.config.chunk_size, self.config.chunk_overlap)
    }

    /// Chunk every document in order, dropping whitespace-only windows.
    ///
    /// The output order is documents in input order, then chunks in text order; the
    /// position of each chunk in the returned vector becomes its passage id.
    #[must_use]
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for doc in documents {
            let before = chunks.len();
            chunks.extend(
                self.chunk(&doc.content)
                    .into_iter()
                    .filter(|text| !text.trim().is_empty())
                    .map(|text| Chunk {
                        source: doc.source.clone(),
                        text,
                    }),
            );
            tracing::debug!(
                source = %doc.source,
                chunks = chunks.len() - before,
                "document chunked"
            );
        }
        chunks
    }
}

/// Split `text` into windows of `size` chars advancing by `size - overlap`.
///
/// # Errors
///
/// Returns `RagError::InvalidConfig` if `size == 0` or `overlap >= size`.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    ChunkerConfig {
        chunk_size: size,
        chunk_overlap: overlap,
    }
    .validate()?;
    Ok(windows(text, size, overlap))
}

// Caller guarantees 0 <= overlap < size.
fn windows(text: &str, size: usize, overlap: usize) -> Vec<String> {
    // Byte offset of every char boundary, plus the end of the string.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = bounds.len() - 1;
    if len == 0 {
        return Vec::new();
    }

    let step = size - overlap;
    let mut chunks = Vec::with_capacity(len.div_ceil(step));
    let mut start = 0;
    loop {
        let end = (start + size).min(len);
        chunks.push(text[bounds[start]..bounds[end]].to_owned());
        if end == len {
            break;
        }
        start += step;
    }
    chunks
}
