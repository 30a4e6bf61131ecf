//! Task plan entities
//!
//! The serde layout mirrors the checkpoint JSON written into external
//! documents (camelCase keys, `plans` for the items of a revision), so plans
//! written by earlier runs stay readable.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Who authored a plan revision.
///
/// Human revisions are written as `"user"`; `"human"` is accepted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RevisionAuthor {
    #[serde(rename = "agent")]
    Agent,
    #[serde(rename = "user", alias = "human")]
    Human,
}

impl RevisionAuthor {
    /// The value written to the checkpoint JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            RevisionAuthor::Agent => "agent",
            RevisionAuthor::Human => "user",
        }
    }
}

impl std::fmt::Display for RevisionAuthor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One step within a plan revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanItem {
    /// Stable position of the step within its revision
    pub index: usize,
    /// Free-text instruction
    pub plan: String,
    pub completed: bool,
    /// Present once the item is completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl PlanItem {
    pub fn new(index: usize, plan: impl Into<String>) -> Self {
        Self {
            index,
            plan: plan.into(),
            completed: false,
            summary: None,
        }
    }

    /// Build incomplete items from an ordered list of steps, indexed from 0.
    pub fn from_steps<I, S>(steps: I) -> Vec<PlanItem>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| PlanItem::new(index, step))
            .collect()
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.completed = true;
        self.summary = Some(summary.into());
        self
    }
}

/// One authored version of the step-by-step instructions for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRevision {
    /// Monotonic, equal to the position in `Task::plan_revisions`
    pub revision_index: usize,
    #[serde(rename = "plans")]
    pub items: Vec<PlanItem>,
    /// Epoch milliseconds
    pub created_at: i64,
    pub created_by: RevisionAuthor,
}

impl PlanRevision {
    pub fn new(
        revision_index: usize,
        items: Vec<PlanItem>,
        created_by: RevisionAuthor,
        created_at: i64,
    ) -> Self {
        Self {
            revision_index,
            items,
            created_at,
            created_by,
        }
    }

    /// Items sorted by `index` ascending.
    pub fn sorted_items(&self) -> Vec<PlanItem> {
        let mut items = self.items.clone();
        items.sort_by_key(|item| item.index);
        items
    }

    /// Whether every item in this revision is completed.
    pub fn is_complete(&self) -> bool {
        self.items.iter().all(|item| item.completed)
    }
}

/// A unit of work with its plan history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque stable identifier
    pub id: String,
    /// Position in the task plan, stable across revisions
    pub task_index: usize,
    /// Free text describing the unit of work
    pub request: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Epoch milliseconds
    pub created_at: i64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub plan_revisions: Vec<PlanRevision>,
    pub active_revision_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request_number: Option<u64>,
}

impl Task {
    /// The revision currently used for execution.
    pub fn active_revision(&self) -> Result<&PlanRevision, DomainError> {
        self.revision(self.active_revision_index)
    }

    /// View a revision by index (history browsing; does not change which
    /// revision is active).
    pub fn revision(&self, revision_index: usize) -> Result<&PlanRevision, DomainError> {
        self.plan_revisions
            .get(revision_index)
            .ok_or_else(|| DomainError::RevisionNotFound {
                task_id: self.id.clone(),
                revision_index,
            })
    }

    pub(crate) fn active_revision_mut(&mut self) -> Result<&mut PlanRevision, DomainError> {
        let revision_index = self.active_revision_index;
        let task_id = self.id.clone();
        self.plan_revisions
            .get_mut(revision_index)
            .ok_or(DomainError::RevisionNotFound {
                task_id,
                revision_index,
            })
    }
}

/// The full ordered set of units of work and their revisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPlan {
    pub tasks: Vec<Task>,
    pub active_task_index: usize,
}

impl TaskPlan {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Find a task by id.
    pub fn task(&self, task_id: &str) -> Result<&Task, DomainError> {
        self.tasks
            .iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| DomainError::TaskNotFound(task_id.to_string()))
    }

    pub(crate) fn task_mut(&mut self, task_id: &str) -> Result<&mut Task, DomainError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| DomainError::TaskNotFound(task_id.to_string()))
    }

    /// Completion progress of the active revision of the active task
    /// (completed / total).
    pub fn progress(&self) -> Option<(usize, usize)> {
        let task = self.tasks.get(self.active_task_index)?;
        let revision = task.active_revision().ok()?;
        let completed = revision.items.iter().filter(|i| i.completed).count();
        Some((completed, revision.items.len()))
    }
}
