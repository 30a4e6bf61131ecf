//! Local file document store.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use stepwise_application::ports::document_store::{DocumentError, DocumentId, DocumentStore};
use tracing::debug;

/// Stores documents as UTF-8 files. Relative paths resolve against `root`.
#[derive(Debug, Clone, Default)]
pub struct FileDocumentStore {
    root: Option<PathBuf>,
}

impl FileDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, id: &DocumentId) -> Result<PathBuf, DocumentError> {
        let DocumentId::File(path) = id else {
            return Err(DocumentError::Unsupported(id.to_string()));
        };
        Ok(match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.clone(),
        })
    }
}

async fn write_replacing(path: &Path, text: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("stepwise.tmp");
    tokio::fs::write(&tmp, text).await?;
    tokio::fs::rename(&tmp, path).await
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn fetch(&self, id: &DocumentId) -> Result<String, DocumentError> {
        let path = self.resolve(id)?;
        debug!(path = %path.display(), "Reading document");
        tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => DocumentError::NotFound(path.display().to_string()),
            _ => DocumentError::Io(e),
        })
    }

    async fn update(&self, id: &DocumentId, text: &str) -> Result<(), DocumentError> {
        let path = self.resolve(id)?;
        debug!(path = %path.display(), bytes = text.len(), "Writing document");
        write_replacing(&path, text).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_and_update() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::with_root(dir.path());
        let id = DocumentId::File(PathBuf::from("issue.md"));
        std::fs::write(dir.path().join("issue.md"), "Fix the flaky test").unwrap();

        assert_eq!(store.fetch(&id).await.unwrap(), "Fix the flaky test");
        store.update(&id, "rewritten").await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("issue.md")).unwrap(), "rewritten");
        assert!(!dir.path().join("issue.stepwise.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::with_root(dir.path());
        let err = store
            .fetch(&DocumentId::File(PathBuf::from("missing.md")))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_other_ids() {
        let store = FileDocumentStore::new();
        let err = store
            .fetch(&DocumentId::Memory("scratch".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Unsupported(_)));
    }
}
