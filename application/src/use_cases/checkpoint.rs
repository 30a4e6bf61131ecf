//! Checkpoint use case
//!
//! Plugs the pure checkpoint codec between a document fetch and update:
//! load plan state from a document, write it back, and keep the token usage
//! ledger in step with what the document already records.

use crate::ports::document_store::{DocumentError, DocumentId, DocumentStore};
use std::sync::Arc;
use stepwise_domain::checkpoint::{self, CheckpointPayload, DETAILS_OPEN_TAG, ProposedPlan};
use stepwise_domain::plan::{self, PlanItem, TaskPlan};
use stepwise_domain::usage::{ModelTokenData, TokenDataUpdate};
use stepwise_domain::DomainError;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while reading or writing checkpoints
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Failed to encode checkpoint payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Plan error: {0}")]
    Plan(#[from] DomainError),

    #[error("Document {0} has no proposed plan")]
    NoProposedPlan(String),

    #[error("Document {0} has no task plan")]
    NoTaskPlan(String),
}

/// Everything a document currently records.
#[derive(Debug, Clone, Default)]
pub struct CheckpointSnapshot {
    pub task_plan: Option<TaskPlan>,
    pub proposed_plan: Option<ProposedPlan>,
    pub token_data: Option<Vec<ModelTokenData>>,
}

/// Reads and writes checkpoint payloads through a [`DocumentStore`].
#[derive(Clone)]
pub struct CheckpointService {
    store: Arc<dyn DocumentStore>,
}

impl CheckpointService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Decode the payload of type `P`; corrupted or absent payloads are `None`.
    pub async fn load<P: CheckpointPayload>(
        &self,
        id: &DocumentId,
    ) -> Result<Option<P>, CheckpointError> {
        let document = self.store.fetch(id).await?;
        Ok(checkpoint::extract(&document))
    }

    pub async fn load_task_plan(&self, id: &DocumentId) -> Result<Option<TaskPlan>, CheckpointError> {
        self.load(id).await
    }

    pub async fn snapshot(&self, id: &DocumentId) -> Result<CheckpointSnapshot, CheckpointError> {
        let document = self.store.fetch(id).await?;
        Ok(CheckpointSnapshot {
            task_plan: checkpoint::extract_task_plan(&document),
            proposed_plan: checkpoint::extract_proposed_plan(&document),
            token_data: checkpoint::extract_token_data(&document),
        })
    }

    /// Write `payload` into the document under its own tags.
    ///
    /// The document is re-fetched right before the write so concurrent
    /// human edits outside the payload region survive. Nothing is written
    /// when the document already holds exactly this payload.
    pub async fn save<P: CheckpointPayload>(
        &self,
        id: &DocumentId,
        payload: &P,
    ) -> Result<(), CheckpointError> {
        let document = self.store.fetch(id).await?;
        let updated = checkpoint::insert_payload(&document, payload)?;
        if updated == document {
            debug!(document = %id, kind = %P::KIND, "Checkpoint unchanged; skipping update");
            return Ok(());
        }
        self.store.update(id, &updated).await?;
        debug!(document = %id, kind = %P::KIND, "Checkpoint written");
        Ok(())
    }

    pub async fn save_task_plan(&self, id: &DocumentId, plan: &TaskPlan) -> Result<(), CheckpointError> {
        self.save(id, plan).await
    }

    /// Rehydrate the usage ledger on startup.
    ///
    /// The recorded ledger replaces `current` verbatim so usage already in
    /// the document is never counted twice. Without a readable ledger,
    /// `current` is kept.
    pub async fn restore_token_data(
        &self,
        id: &DocumentId,
        current: Vec<ModelTokenData>,
    ) -> Result<Vec<ModelTokenData>, CheckpointError> {
        match self.load::<Vec<ModelTokenData>>(id).await? {
            Some(recorded) => Ok(TokenDataUpdate::Replace(recorded).apply(current)),
            None => Ok(current),
        }
    }

    /// Merge a usage delta into the document's ledger and write it back.
    pub async fn record_token_usage(
        &self,
        id: &DocumentId,
        delta: Vec<ModelTokenData>,
    ) -> Result<Vec<ModelTokenData>, CheckpointError> {
        let recorded = self
            .load::<Vec<ModelTokenData>>(id)
            .await?
            .unwrap_or_default();
        let merged = TokenDataUpdate::Merge(delta).apply(recorded);
        self.save(id, &merged).await?;
        Ok(merged)
    }

    pub async fn propose_plan(&self, id: &DocumentId, steps: Vec<String>) -> Result<(), CheckpointError> {
        self.save(id, &ProposedPlan(steps)).await
    }

    /// Turn the document's proposed plan into a new active task.
    ///
    /// Without an explicit `request`, the document prose before the
    /// collapsible wrapper is used.
    pub async fn accept_proposed_plan(
        &self,
        id: &DocumentId,
        request: Option<String>,
        now: i64,
    ) -> Result<TaskPlan, CheckpointError> {
        let document = self.store.fetch(id).await?;
        let proposed = checkpoint::extract_proposed_plan(&document)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| CheckpointError::NoProposedPlan(id.to_string()))?;

        let request = request.unwrap_or_else(|| request_from_document(&document));
        let items = PlanItem::from_steps(proposed.0);
        let plan = match checkpoint::extract_task_plan(&document) {
            Some(existing) => plan::add_task(existing, request, items, now),
            None => plan::create_task_plan(request, items, now),
        };

        self.save_task_plan(id, &plan).await?;
        info!(document = %id, tasks = plan.tasks.len(), "Accepted proposed plan");
        Ok(plan)
    }

    /// Complete an item of the active revision and persist the result.
    ///
    /// `task_id` defaults to the active task.
    pub async fn complete_item(
        &self,
        id: &DocumentId,
        task_id: Option<&str>,
        item_index: usize,
        summary: String,
    ) -> Result<TaskPlan, CheckpointError> {
        let current = self
            .load_task_plan(id)
            .await?
            .ok_or_else(|| CheckpointError::NoTaskPlan(id.to_string()))?;
        let task_id = match task_id {
            Some(task_id) => task_id.to_string(),
            None => plan::active_task(&current)?.id.clone(),
        };

        let updated = plan::complete_plan_item(current, &task_id, item_index, summary)?;
        self.save_task_plan(id, &updated).await?;
        Ok(updated)
    }
}

fn request_from_document(document: &str) -> String {
    let prose = document
        .split(DETAILS_OPEN_TAG)
        .next()
        .unwrap_or_default()
        .trim();
    if prose.is_empty() {
        "Accepted proposed plan".to_string()
    } else {
        prose.to_string()
    }
}
