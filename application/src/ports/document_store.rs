//! Document store port
//!
//! The checkpoint lives in an external text document (an issue body, a local
//! file). Stores only fetch and overwrite whole documents; read-modify-write
//! atomicity is the caller's concern.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from a document store
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Unsupported document id for this store: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command failed: {0}")]
    Command(String),
}

/// Identifies a checkpoint document.
///
/// Parsed from the command line as `gh:owner/repo#123`, `gh:#123` (issue in
/// the current repository), `mem:name`, or a file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentId {
    File(PathBuf),
    GitHubIssue { repo: Option<String>, number: u64 },
    Memory(String),
}

impl std::str::FromStr for DocumentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("gh:") {
            let (repo, number) = rest
                .rsplit_once('#')
                .ok_or_else(|| format!("Expected gh:owner/repo#N, got '{}'", s))?;
            let number: u64 = number
                .parse()
                .map_err(|_| format!("Invalid issue number in '{}'", s))?;
            let repo = match repo {
                "" => None,
                r if r.split('/').count() == 2 && !r.starts_with('/') && !r.ends_with('/') => {
                    Some(r.to_string())
                }
                _ => return Err(format!("Expected owner/repo in '{}'", s)),
            };
            return Ok(DocumentId::GitHubIssue { repo, number });
        }
        if let Some(name) = s.strip_prefix("mem:") {
            return Ok(DocumentId::Memory(name.to_string()));
        }
        if s.is_empty() {
            return Err("Empty document id".to_string());
        }
        Ok(DocumentId::File(PathBuf::from(s)))
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentId::File(path) => write!(f, "{}", path.display()),
            DocumentId::GitHubIssue {
                repo: Some(repo),
                number,
            } => write!(f, "gh:{}#{}", repo, number),
            DocumentId::GitHubIssue { repo: None, number } => write!(f, "gh:#{}", number),
            DocumentId::Memory(name) => write!(f, "mem:{}", name),
        }
    }
}

/// Fetch and overwrite external documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch(&self, id: &DocumentId) -> Result<String, DocumentError>;

    async fn update(&self, id: &DocumentId, text: &str) -> Result<(), DocumentError>;
}
