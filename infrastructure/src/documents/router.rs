//! Dispatch document ids to the matching store.

use async_trait::async_trait;
use std::sync::Arc;
use stepwise_application::ports::document_store::{DocumentError, DocumentId, DocumentStore};

/// [`DocumentStore`] that forwards each id to the store for its kind.
#[derive(Default)]
pub struct DocumentRouter {
    files: Option<Arc<dyn DocumentStore>>,
    github: Option<Arc<dyn DocumentStore>>,
    memory: Option<Arc<dyn DocumentStore>>,
}

impl DocumentRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.files = Some(store);
        self
    }

    pub fn with_github(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.github = Some(store);
        self
    }

    pub fn with_memory(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.memory = Some(store);
        self
    }

    fn store_for(&self, id: &DocumentId) -> Result<&Arc<dyn DocumentStore>, DocumentError> {
        let (store, what) = match id {
            DocumentId::File(_) => (&self.files, "file documents"),
            DocumentId::GitHubIssue { .. } => (&self.github, "GitHub issues (is gh installed and authenticated?)"),
            DocumentId::Memory(_) => (&self.memory, "in-memory documents"),
        };
        store
            .as_ref()
            .ok_or_else(|| DocumentError::Unsupported(format!("{}: no store for {}", id, what)))
    }
}

#[async_trait]
impl DocumentStore for DocumentRouter {
    async fn fetch(&self, id: &DocumentId) -> Result<String, DocumentError> {
        self.store_for(id)?.fetch(id).await
    }

    async fn update(&self, id: &DocumentId, text: &str) -> Result<(), DocumentError> {
        self.store_for(id)?.update(id, text).await
    }
}
