//! Source of document text.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Document;

/// Failure to load a document.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document has this id.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The document exists but could not be read.
    #[error("failed to read document {id}: {source}")]
    Io {
        /// Requested id.
        id: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Anything that can hand out documents by id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Loads the document with the given id.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the document is missing or unreadable.
    async fn load(&self, file_id: &str) -> Result<Document, StoreError>;

    /// Loads several documents, failing on the first error.
    ///
    /// # Errors
    /// Returns the first [`StoreError`] encountered.
    async fn load_all(&self, file_ids: &[String]) -> Result<Vec<Document>, StoreError> {
        let mut documents = Vec::with_capacity(file_ids.len());
        for id in file_ids {
            documents.push(self.load(id).await?);
        }
        Ok(documents)
    }
}

/// Documents held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: HashMap<String, Document>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a document.
    #[must_use]
    pub fn with_document(mut self, document: Document) -> Self {
        self.documents.insert(document.id.clone(), document);
        self
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self, file_id: &str) -> Result<Document, StoreError> {
        self.documents
            .get(file_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(file_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_all_preserves_order_and_reports_missing() {
        let store = MemoryStore::new()
            .with_document(Document::new("a", "alpha"))
            .with_document(Document::new("b", "beta"));

        let docs = store.load_all(&["b".into(), "a".into()]).await.unwrap();
        assert_eq!(docs[0].text, "beta");
        assert_eq!(docs[1].text, "alpha");

        let err = store.load_all(&["a".into(), "zzz".into()]).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "zzz"));
    }
}
