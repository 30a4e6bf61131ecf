//! In-memory document store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use stepwise_application::ports::document_store::{DocumentError, DocumentId, DocumentStore};

/// Keeps `mem:` documents in a map, for embedders and tests.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: Mutex<HashMap<String, String>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), text.into());
        self
    }

    /// Current text of a document, if present.
    pub fn get(&self, name: &str) -> Option<String> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

fn memory_name(id: &DocumentId) -> Result<&str, DocumentError> {
    match id {
        DocumentId::Memory(name) => Ok(name),
        other => Err(DocumentError::Unsupported(other.to_string())),
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn fetch(&self, id: &DocumentId) -> Result<String, DocumentError> {
        let name = memory_name(id)?;
        self.get(name)
            .ok_or_else(|| DocumentError::NotFound(id.to_string()))
    }

    async fn update(&self, id: &DocumentId, text: &str) -> Result<(), DocumentError> {
        let name = memory_name(id)?;
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let store = InMemoryDocumentStore::new().with_document("issue", "body");
        let id = DocumentId::Memory("issue".to_string());

        assert_eq!(store.fetch(&id).await.unwrap(), "body");
        store.update(&id, "new body").await.unwrap();
        assert_eq!(store.get("issue").as_deref(), Some("new body"));
    }

    #[tokio::test]
    async fn test_missing_document() {
        let store = InMemoryDocumentStore::new();
        let err = store
            .fetch(&DocumentId::Memory("nope".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::NotFound(_)));
    }
}
