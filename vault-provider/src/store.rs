//! Filesystem-backed [`DocumentStore`].

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use vault_extraction::store::{DocumentStore, StoreError};
use vault_extraction::types::Document;

/// Serves plain-text documents from a directory. The file id is the path
/// relative to the root.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    /// A store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory documents are read from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves an id to a path, refusing anything outside the root.
    fn resolve(&self, file_id: &str) -> Option<PathBuf> {
        let relative = Path::new(file_id);
        let contained = !file_id.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        contained.then(|| self.root.join(relative))
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn load(&self, file_id: &str) -> Result<Document, StoreError> {
        let Some(path) = self.resolve(file_id) else {
            tracing::warn!(file_id, "rejected document id outside the store root");
            return Err(StoreError::NotFound(file_id.to_string()));
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                tracing::debug!(file_id, chars = text.len(), "loaded document");
                Ok(Document::new(file_id, text))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(file_id.to_string()))
            }
            Err(source) => Err(StoreError::Io {
                id: file_id.to_string(),
                source,
            }),
        }
    }
}
