//! Shared, swappable view of the published generation.

use std::sync::{Arc, PoisonError, RwLock};

use crate::corpus::Corpus;
use crate::error::Result;
use crate::index::FlatIndex;
use crate::store::IndexStore;

/// An index and its corpus, always read and replaced together.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Generation the pair was loaded from; `None` for in-memory pairs.
    pub generation: Option<String>,
    pub index: FlatIndex,
    pub corpus: Corpus,
}

/// Readers clone the current `Arc<Snapshot>` and keep using it for the whole query,
/// so a concurrent publish never mixes an old index with a new corpus.
#[derive(Debug, Default)]
pub struct IndexHandle {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl IndexHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(snapshot))),
        }
    }

    /// Open the published generation in `store`, or an empty handle if there is none.
    ///
    /// # Errors
    ///
    /// Returns any error from [`IndexStore::load_current`].
    pub fn open(store: &IndexStore) -> Result<Self> {
        let handle = Self::new();
        handle.reload(store)?;
        Ok(handle)
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn generation(&self) -> Option<String> {
        self.snapshot().and_then(|s| s.generation.clone())
    }

    // Only the ingestion pipeline swaps in new generations.
    pub(crate) fn publish(&self, snapshot: Snapshot) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(snapshot));
    }

    /// Re-read the published generation from disk. Returns whether one was found.
    ///
    /// # Errors
    ///
    /// Returns any error from [`IndexStore::load_current`]; the handle is unchanged.
    pub fn reload(&self, store: &IndexStore) -> Result<bool> {
        let loaded = store.load_current()?;
        let found = loaded.is_some();
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = loaded.map(Arc::new);
        Ok(found)
    }

    /// Drop the cached snapshot; queries fail with `NotIngested` until the next reload.
    pub fn invalidate(&self) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::Chunk;

    fn snapshot(text: &str) -> Snapshot {
        Snapshot {
            generation: None,
            index: FlatIndex::from_vectors(&[vec![1.0]]).unwrap(),
            corpus: Corpus::from_chunks(vec![Chunk {
                source: "s".into(),
                text: text.into(),
            }]),
        }
    }

    #[test]
    fn readers_keep_their_snapshot_across_publish() {
        let handle = IndexHandle::from_snapshot(snapshot("old"));
        let held = handle.snapshot().unwrap();
        handle.publish(snapshot("new"));

        assert_eq!(held.corpus.get(0).unwrap().text, "old");
        assert_eq!(handle.snapshot().unwrap().corpus.get(0).unwrap().text, "new");
    }

    #[test]
    fn invalidate_clears() {
        let handle = IndexHandle::from_snapshot(snapshot("x"));
        handle.invalidate();
        assert!(handle.snapshot().is_none());
    }

    #[test]
    fn reload_reads_published_generation() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let handle = IndexHandle::new();
        assert!(!handle.reload(&store).unwrap());

        let snap = snapshot("persisted");
        let generation = store.write_generation(&snap.index, &snap.corpus).unwrap();
        store.publish(&generation).unwrap();

        assert!(handle.reload(&store).unwrap());
        assert_eq!(handle.generation(), Some(generation));
    }
}
