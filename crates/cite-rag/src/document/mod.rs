//! Document sources: the collaborator that turns files into `(source, text)` pairs.

pub mod error;
pub mod loader;

use std::path::{Path, PathBuf};

pub use error::DocumentError;
#[cfg(feature = "pdf")]
pub use loader::PdfLoader;
pub use loader::TextLoader;

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: String,
    pub content_type: String,
    pub content: String,
}

impl Document {
    #[must_use]
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content_type: "text/plain".to_owned(),
            content: content.into(),
        }
    }
}

pub trait DocumentLoader: Send + Sync {
    fn load(
        &self,
        path: &Path,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<Document>, DocumentError>> + Send + '_>,
    >;

    fn supported_extensions(&self) -> &[&str];
}

/// Loaders for every format this build understands.
#[must_use]
pub fn default_loaders(max_file_size: u64) -> Vec<Box<dyn DocumentLoader>> {
    let mut loaders: Vec<Box<dyn DocumentLoader>> = vec![Box::new(TextLoader { max_file_size })];
    #[cfg(feature = "pdf")]
    loaders.push(Box::new(PdfLoader { max_file_size }));
    loaders
}

fn loader_for<'a>(
    loaders: &'a [Box<dyn DocumentLoader>],
    path: &Path,
) -> Option<&'a dyn DocumentLoader> {
    let ext = path.extension().and_then(|e| e.to_str())?.to_ascii_lowercase();
    loaders
        .iter()
        .find(|l| l.supported_extensions().contains(&ext.as_str()))
        .map(AsRef::as_ref)
}

/// Expand `paths` into the sorted list of loadable files.
///
/// Directories are walked recursively, honoring `.gitignore` and skipping hidden
/// entries. Explicit file arguments must have a supported extension.
///
/// # Errors
///
/// Returns `DocumentError::UnsupportedFormat` for an explicit file no loader accepts,
/// or an IO error for a path that does not exist.
pub fn discover(
    paths: &[PathBuf],
    loaders: &[Box<dyn DocumentLoader>],
) -> Result<Vec<PathBuf>, DocumentError> {
    let mut files = Vec::new();
    for path in paths {
        let meta = std::fs::metadata(path)?;
        if meta.is_file() {
            if loader_for(loaders, path).is_none() {
                return Err(DocumentError::UnsupportedFormat(path.display().to_string()));
            }
            files.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = ignore::WalkBuilder::new(path)
            .hidden(true)
            .git_ignore(true)
            .build()
            .flatten()
            .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
            .map(ignore::DirEntry::into_path)
            .filter(|p| loader_for(loaders, p).is_some())
            .collect();
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

/// Load every file under `paths` into documents, in discovery order.
///
/// # Errors
///
/// Returns the first discovery or loading failure.
pub async fn load_all(
    paths: &[PathBuf],
    loaders: &[Box<dyn DocumentLoader>],
) -> Result<Vec<Document>, DocumentError> {
    let files = discover(paths, loaders)?;
    tracing::info!(files = files.len(), "loading documents");

    let mut documents = Vec::with_capacity(files.len());
    for file in &files {
        let Some(loader) = loader_for(loaders, file) else {
            continue;
        };
        let loaded = loader.load(file).await?;
        tracing::debug!(path = %file.display(), documents = loaded.len(), "loaded");
        documents.extend(loaded);
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_walks_directories_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.md"), "a").unwrap();
        std::fs::write(dir.path().join("skip.bin"), "x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/c.txt"), "c").unwrap();

        let loaders = default_loaders(DEFAULT_MAX_FILE_SIZE);
        let files = discover(&[dir.path().to_path_buf()], &loaders).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["a.md", "b.txt", "sub/c.txt"]);
    }

    #[test]
    fn discover_rejects_unsupported_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.bin");
        std::fs::write(&file, "x").unwrap();

        let loaders = default_loaders(DEFAULT_MAX_FILE_SIZE);
        let result = discover(&[file], &loaders);
        assert!(matches!(result, Err(DocumentError::UnsupportedFormat(_))));
    }

    #[test]
    fn discover_missing_path_errors() {
        let loaders = default_loaders(DEFAULT_MAX_FILE_SIZE);
        let result = discover(&[PathBuf::from("/nonexistent/cite-docs")], &loaders);
        assert!(matches!(result, Err(DocumentError::Io(_))));
    }

    #[tokio::test]
    async fn load_all_preserves_discovery_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2.txt"), "second").unwrap();
        std::fs::write(dir.path().join("1.txt"), "first").unwrap();

        let loaders = default_loaders(DEFAULT_MAX_FILE_SIZE);
        let docs = load_all(&[dir.path().to_path_buf()], &loaders)
            .await
            .unwrap();
        let contents: Vec<_> = docs.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, ["first", "second"]);
    }
}
