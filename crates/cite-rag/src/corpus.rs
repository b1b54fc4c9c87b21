//! Passage storage aligned by position with the vector index.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chunker::Chunk;
use crate::error::Result;
use crate::types::Passage;

// On-disk shape; the id is implicit in the array position.
#[derive(Serialize, Deserialize)]
struct Record {
    source: String,
    text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    passages: Vec<Passage>,
}

impl Corpus {
    /// Assign ids to chunks by position.
    #[must_use]
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        let passages = chunks
            .into_iter()
            .enumerate()
            .map(|(id, c)| Passage {
                id,
                text: c.text,
                source: c.source,
            })
            .collect();
        Self { passages }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: usize) -> Option<&Passage> {
        self.passages.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Passage> {
        self.passages.iter()
    }

    /// # Errors
    ///
    /// Returns a serialization error.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let records: Vec<Record> = self
            .passages
            .iter()
            .map(|p| Record {
                source: p.source.clone(),
                text: p.text.clone(),
            })
            .collect();
        Ok(serde_json::to_vec_pretty(&records)?)
    }

    /// # Errors
    ///
    /// Returns a deserialization error for malformed JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let records: Vec<Record> = serde_json::from_slice(bytes)?;
        let passages = records
            .into_iter()
            .enumerate()
            .map(|(id, r)| Passage {
                id,
                text: r.text,
                source: r.source,
            })
            .collect();
        Ok(Self { passages })
    }

    /// # Errors
    ///
    /// Returns an IO or serialization error.
    pub fn persist(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an IO or deserialization error.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_json(&bytes)
    }
}
