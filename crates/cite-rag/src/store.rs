//! Generation-based persistence of index and corpus.
//!
//! ```text
//! <data_dir>/CURRENT                      name of the published generation
//! <data_dir>/generations/<uuid>/index.bin
//! <data_dir>/generations/<uuid>/corpus.json
//! ```
//!
//! A generation directory is written completely before `CURRENT` is replaced by
//! rename, so a reader following `CURRENT` never sees a half-written pair.
//! Writers across processes are serialized by an advisory lock on `<data_dir>/LOCK`.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt as _;
use uuid::Uuid;

use crate::corpus::Corpus;
use crate::error::{RagError, Result};
use crate::handle::Snapshot;
use crate::index::FlatIndex;

const CURRENT_FILE: &str = "CURRENT";
const GENERATIONS_DIR: &str = "generations";
const INDEX_FILE: &str = "index.bin";
const CORPUS_FILE: &str = "corpus.json";
const LOCK_FILE: &str = "LOCK";

/// Exclusive writer lock on a data directory. Released when dropped.
#[derive(Debug)]
pub struct WriterLock {
    _file: File,
}

#[derive(Debug, Clone)]
pub struct IndexStore {
    data_dir: PathBuf,
}

impl IndexStore {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn generations_dir(&self) -> PathBuf {
        self.data_dir.join(GENERATIONS_DIR)
    }

    #[must_use]
    pub fn generation_dir(&self, generation: &str) -> PathBuf {
        self.generations_dir().join(generation)
    }

    /// Block until this process holds the exclusive writer lock on the data directory.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the lock file cannot be created or locked.
    pub fn lock_writer(&self) -> Result<WriterLock> {
        std::fs::create_dir_all(&self.data_dir)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.data_dir.join(LOCK_FILE))?;
        file.lock_exclusive()?;
        Ok(WriterLock { _file: file })
    }

    /// Write, publish and prune a generation while holding the writer lock.
    ///
    /// # Errors
    ///
    /// Returns an IO or serialization error from locking, writing or publishing.
    /// Nothing is published on error.
    pub fn commit(&self, index: &FlatIndex, corpus: &Corpus) -> Result<String> {
        let _lock = self.lock_writer()?;
        let generation = self.write_generation(index, corpus)?;
        self.publish(&generation)?;
        self.prune(&generation);
        Ok(generation)
    }

    /// Name of the published generation, if any.
    ///
    /// # Errors
    ///
    /// Returns an IO error other than not-found, or `RagError::CorruptIndex` if the
    /// pointer does not name a generation.
    pub fn current_generation(&self) -> Result<Option<String>> {
        let raw = match std::fs::read_to_string(self.data_dir.join(CURRENT_FILE)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let name = raw.trim();
        if Uuid::parse_str(name).is_err() {
            return Err(RagError::CorruptIndex(format!(
                "CURRENT does not name a generation: {name:?}"
            )));
        }
        Ok(Some(name.to_owned()))
    }

    /// Load the published generation.
    ///
    /// Sizes are not cross-checked here; a mismatched pair is loaded as-is and
    /// refused at query time.
    ///
    /// # Errors
    ///
    /// Returns IO, JSON or `RagError::CorruptIndex` errors from either file.
    pub fn load_current(&self) -> Result<Option<Snapshot>> {
        let Some(generation) = self.current_generation()? else {
            return Ok(None);
        };
        let dir = self.generation_dir(&generation);
        let index = FlatIndex::load(&dir.join(INDEX_FILE))?;
        let corpus = Corpus::load(&dir.join(CORPUS_FILE))?;
        if index.len() != corpus.len() {
            tracing::warn!(
                generation = %generation,
                index = index.len(),
                corpus = corpus.len(),
                "loaded generation is inconsistent"
            );
        }
        tracing::debug!(generation = %generation, passages = corpus.len(), "generation loaded");
        Ok(Some(Snapshot {
            generation: Some(generation),
            index,
            corpus,
        }))
    }

    /// Write `index` and `corpus` into a fresh generation directory. Not yet published.
    ///
    /// # Errors
    ///
    /// Returns an IO or serialization error; the partial directory is removed.
    pub fn write_generation(&self, index: &FlatIndex, corpus: &Corpus) -> Result<String> {
        let generation = Uuid::new_v4().to_string();
        let dir = self.generation_dir(&generation);
        std::fs::create_dir_all(&dir)?;

        let written = index
            .persist(&dir.join(INDEX_FILE))
            .and_then(|()| corpus.persist(&dir.join(CORPUS_FILE)));
        if let Err(e) = written {
            let _ = std::fs::remove_dir_all(&dir);
            return Err(e);
        }
        Ok(generation)
    }

    /// Point `CURRENT` at `generation` by atomic rename.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the pointer cannot be written or renamed.
    pub fn publish(&self, generation: &str) -> Result<()> {
        let tmp = self.data_dir.join(format!("{CURRENT_FILE}.tmp"));
        std::fs::write(&tmp, generation)?;
        std::fs::rename(&tmp, self.data_dir.join(CURRENT_FILE))?;
        tracing::info!(generation, "generation published");
        Ok(())
    }

    /// Remove every generation directory except `keep` and the one `CURRENT` names.
    /// Failures are logged, not returned.
    pub fn prune(&self, keep: &str) -> usize {
        let current = match self.current_generation() {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(error = %e, "cannot read CURRENT, skipping prune");
                return 0;
            }
        };
        let entries = match std::fs::read_dir(self.generations_dir()) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "cannot list generations for pruning");
                return 0;
            }
        };
        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name == keep || current.as_deref().is_some_and(|c| name == c) {
                continue;
            }
            match std::fs::remove_dir_all(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "prune failed");
                }
            }
        }
        if removed > 0 {
            tracing::debug!(removed, "old generations pruned");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::Chunk;

    fn pair() -> (FlatIndex, Corpus) {
        let index = FlatIndex::from_vectors(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let corpus = Corpus::from_chunks(vec![
            Chunk {
                source: "a".into(),
                text: "one".into(),
            },
            Chunk {
                source: "a".into(),
                text: "two".into(),
            },
        ]);
        (index, corpus)
    }

    #[test]
    fn nothing_published_initially() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        assert!(store.current_generation().unwrap().is_none());
        assert!(store.load_current().unwrap().is_none());
    }

    #[test]
    fn unpublished_generation_is_invisible() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let (index, corpus) = pair();
        store.write_generation(&index, &corpus).unwrap();
        assert!(store.load_current().unwrap().is_none());
    }

    #[test]
    fn publish_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let (index, corpus) = pair();
        let generation = store.write_generation(&index, &corpus).unwrap();
        store.publish(&generation).unwrap();

        let snapshot = store.load_current().unwrap().unwrap();
        assert_eq!(snapshot.generation.as_deref(), Some(generation.as_str()));
        assert_eq!(snapshot.index, index);
        assert_eq!(snapshot.corpus, corpus);
        assert!(!dir.path().join("CURRENT.tmp").exists());
    }

    #[test]
    fn prune_keeps_current() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let (index, corpus) = pair();
        let old = store.write_generation(&index, &corpus).unwrap();
        let new = store.write_generation(&index, &corpus).unwrap();
        store.publish(&new).unwrap();

        assert_eq!(store.prune(&new), 1);
        assert!(!store.generation_dir(&old).exists());
        assert!(store.generation_dir(&new).exists());
    }

    #[test]
    fn prune_spares_generation_published_by_another_writer() {
        let dir = tempfile::tempdir().unwrap();
        let a = IndexStore::new(dir.path());
        let b = IndexStore::new(dir.path());
        let (index, corpus) = pair();

        let ga = a.write_generation(&index, &corpus).unwrap();
        a.publish(&ga).unwrap();
        let gb = b.write_generation(&index, &corpus).unwrap();
        b.publish(&gb).unwrap();

        a.prune(&ga);
        let snapshot = b.load_current().unwrap().unwrap();
        assert_eq!(snapshot.generation.as_deref(), Some(gb.as_str()));
        assert_eq!(snapshot.corpus, corpus);
    }

    #[test]
    fn commit_publishes_and_prunes() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let (index, corpus) = pair();
        let first = store.commit(&index, &corpus).unwrap();
        let second = store.commit(&index, &corpus).unwrap();

        assert_eq!(store.current_generation().unwrap(), Some(second.clone()));
        assert!(!store.generation_dir(&first).exists());
        assert!(store.generation_dir(&second).exists());
        assert!(dir.path().join("LOCK").exists());
    }

    #[test]
    fn writer_lock_excludes_second_writer() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};

        let dir = tempfile::tempdir().unwrap();
        let held = IndexStore::new(dir.path()).lock_writer().unwrap();

        let acquired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&acquired);
        let other = IndexStore::new(dir.path());
        let waiter = std::thread::spawn(move || {
            let _lock = other.lock_writer().unwrap();
            flag.store(true, Ordering::SeqCst);
        });

        std::thread::sleep(std::time::Duration::from_millis(100));
        assert!(!acquired.load(Ordering::SeqCst));
        drop(held);
        waiter.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
    }

    #[test]
    fn garbage_pointer_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("CURRENT"), "../../etc").unwrap();
        let store = IndexStore::new(dir.path());
        assert!(matches!(
            store.current_generation(),
            Err(RagError::CorruptIndex(_))
        ));
    }

    #[test]
    fn mismatched_generation_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let (index, _) = pair();
        let corpus = Corpus::from_chunks(vec![Chunk {
            source: "a".into(),
            text: "one".into(),
        }]);
        let generation = store.write_generation(&index, &corpus).unwrap();
        store.publish(&generation).unwrap();

        let snapshot = store.load_current().unwrap().unwrap();
        assert_eq!(snapshot.index.len(), 2);
        assert_eq!(snapshot.corpus.len(), 1);
    }
}
