//! GitHub issue bodies as documents, through the `gh` CLI.
//!
//! Reads with `gh issue view N --json body` and writes with
//! `gh issue edit N --body-file -` (body on stdin).

use async_trait::async_trait;
use std::process::Stdio;
use stepwise_application::ports::document_store::{DocumentError, DocumentId, DocumentStore};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Document store backed by GitHub issue bodies.
///
/// Created via `try_new()` which validates that `gh` is installed and
/// authenticated; `None` otherwise.
pub struct GitHubIssueStore {
    working_dir: Option<String>,
}

impl GitHubIssueStore {
    pub async fn try_new(working_dir: Option<String>) -> Option<Self> {
        if which::which("gh").is_err() {
            debug!("gh CLI not found, GitHub issue documents disabled");
            return None;
        }

        let mut cmd = Command::new("gh");
        cmd.arg("auth")
            .arg("status")
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(ref dir) = working_dir {
            cmd.current_dir(dir);
        }
        match cmd.status().await {
            Ok(status) if status.success() => {
                info!("GitHub issue document store initialized");
                Some(Self { working_dir })
            }
            _ => {
                debug!("gh CLI not authenticated, GitHub issue documents disabled");
                None
            }
        }
    }

    fn command(&self, args: Vec<String>) -> Command {
        let mut cmd = Command::new("gh");
        cmd.args(args);
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

fn issue_ref(id: &DocumentId) -> Result<(Option<&str>, u64), DocumentError> {
    match id {
        DocumentId::GitHubIssue { repo, number } => Ok((repo.as_deref(), *number)),
        other => Err(DocumentError::Unsupported(other.to_string())),
    }
}

fn view_args(repo: Option<&str>, number: u64) -> Vec<String> {
    let mut args = vec![
        "issue".to_string(),
        "view".to_string(),
        number.to_string(),
        "--json".to_string(),
        "body".to_string(),
    ];
    if let Some(repo) = repo {
        args.extend(["--repo".to_string(), repo.to_string()]);
    }
    args
}

fn edit_args(repo: Option<&str>, number: u64) -> Vec<String> {
    let mut args = vec![
        "issue".to_string(),
        "edit".to_string(),
        number.to_string(),
        "--body-file".to_string(),
        "-".to_string(),
    ];
    if let Some(repo) = repo {
        args.extend(["--repo".to_string(), repo.to_string()]);
    }
    args
}

fn parse_body(stdout: &str) -> Result<String, DocumentError> {
    let json: serde_json::Value = serde_json::from_str(stdout)
        .map_err(|e| DocumentError::Command(format!("Failed to parse gh output: {}", e)))?;
    Ok(json["body"].as_str().unwrap_or("").to_string())
}

#[async_trait]
impl DocumentStore for GitHubIssueStore {
    async fn fetch(&self, id: &DocumentId) -> Result<String, DocumentError> {
        let (repo, number) = issue_ref(id)?;
        debug!("Fetching issue body {} (repo={:?})", number, repo);

        let output = self.command(view_args(repo, number)).output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.contains("Could not resolve") || stderr.contains("not found") {
                return Err(DocumentError::NotFound(id.to_string()));
            }
            return Err(DocumentError::Command(format!("gh issue view failed: {}", stderr)));
        }

        parse_body(&String::from_utf8_lossy(&output.stdout))
    }

    async fn update(&self, id: &DocumentId, text: &str) -> Result<(), DocumentError> {
        let (repo, number) = issue_ref(id)?;
        debug!("Updating issue body {} (repo={:?}, bytes={})", number, repo, text.len());

        let mut child = self
            .command(edit_args(repo, number))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocumentError::Command(format!(
                "gh issue edit failed: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }
}
