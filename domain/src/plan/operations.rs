//! Pure task plan operations
//!
//! Every mutation takes the current [`TaskPlan`] by value and returns the new
//! value. Nothing here performs I/O; persisting the result is the caller's job.

use super::entities::{PlanItem, PlanRevision, RevisionAuthor, Task, TaskPlan};
use crate::core::error::DomainError;
use tracing::warn;

/// The currently active task.
///
/// An empty plan or an out-of-range `active_task_index` is reported, never
/// clamped.
pub fn active_task(plan: &TaskPlan) -> Result<&Task, DomainError> {
    if plan.tasks.is_empty() {
        return Err(DomainError::EmptyPlan);
    }
    plan.tasks
        .get(plan.active_task_index)
        .ok_or(DomainError::ActiveTaskOutOfRange {
            index: plan.active_task_index,
            len: plan.tasks.len(),
        })
}

/// Items of the active revision of the active task, sorted by `index`.
pub fn active_plan_items(plan: &TaskPlan) -> Result<Vec<PlanItem>, DomainError> {
    let task = active_task(plan)?;
    Ok(task.active_revision()?.sorted_items())
}

/// The lowest-index incomplete item, or `None` when every item is complete.
///
/// Several incomplete items sharing the lowest index is a malformed revision;
/// the first one in slice order is chosen and the anomaly is logged.
pub fn current_plan_item(items: &[PlanItem]) -> Option<&PlanItem> {
    let current = items
        .iter()
        .filter(|item| !item.completed)
        .min_by_key(|item| item.index)?;

    let duplicates = items
        .iter()
        .filter(|item| !item.completed && item.index == current.index)
        .count();
    if duplicates > 1 {
        warn!(
            index = current.index,
            count = duplicates,
            "Duplicate plan item index among incomplete items; using the first"
        );
    }

    Some(current)
}

/// Incomplete items, sorted by `index`.
pub fn remaining_plan_items(items: &[PlanItem]) -> Vec<&PlanItem> {
    let mut remaining: Vec<&PlanItem> = items.iter().filter(|i| !i.completed).collect();
    remaining.sort_by_key(|i| i.index);
    remaining
}

/// Completed items, sorted by `index`.
pub fn completed_plan_items(items: &[PlanItem]) -> Vec<&PlanItem> {
    let mut completed: Vec<&PlanItem> = items.iter().filter(|i| i.completed).collect();
    completed.sort_by_key(|i| i.index);
    completed
}

/// Mark an item of the task's active revision as completed.
///
/// Completion is monotone: an item that is already completed keeps its
/// original summary and the plan is returned unchanged. Neither
/// `active_task_index` nor the revision list is touched.
pub fn complete_plan_item(
    mut plan: TaskPlan,
    task_id: &str,
    item_index: usize,
    summary: impl Into<String>,
) -> Result<TaskPlan, DomainError> {
    let task = plan.task_mut(task_id)?;
    let revision = task.active_revision_mut()?;

    let mut matching = revision
        .items
        .iter_mut()
        .filter(|item| item.index == item_index)
        .peekable();
    if matching.peek().is_none() {
        return Err(DomainError::PlanItemNotFound {
            task_id: task_id.to_string(),
            item_index,
        });
    }

    // With duplicate indices only the first incomplete one is marked
    if let Some(item) = matching.find(|item| !item.completed) {
        item.completed = true;
        item.summary = Some(summary.into());
    }

    Ok(plan)
}

/// Start a new plan with a single task.
pub fn create_task_plan(
    request: impl Into<String>,
    items: Vec<PlanItem>,
    now: i64,
) -> TaskPlan {
    add_task(TaskPlan::default(), request, items, now)
}

/// Append a task with an initial agent revision and make it active.
pub fn add_task(
    mut plan: TaskPlan,
    request: impl Into<String>,
    items: Vec<PlanItem>,
    now: i64,
) -> TaskPlan {
    let task_index = plan.tasks.len();
    plan.tasks.push(Task {
        id: uuid::Uuid::new_v4().to_string(),
        task_index,
        request: request.into(),
        title: None,
        created_at: now,
        completed: false,
        completed_at: None,
        summary: None,
        plan_revisions: vec![PlanRevision::new(0, items, RevisionAuthor::Agent, now)],
        active_revision_index: 0,
        pull_request_number: None,
    });
    plan.active_task_index = task_index;
    plan
}

/// Append a new revision to a task and make it the active one.
///
/// Every completed item of the previous active revision must appear in the
/// new revision unchanged (same index, text and summary).
pub fn revise_plan(
    mut plan: TaskPlan,
    task_id: &str,
    items: Vec<PlanItem>,
    created_by: RevisionAuthor,
    now: i64,
) -> Result<TaskPlan, DomainError> {
    let task = plan.task_mut(task_id)?;
    let previous = task.active_revision()?;

    for done in previous.items.iter().filter(|i| i.completed) {
        let carried = items.iter().any(|i| i == done);
        if !carried {
            return Err(DomainError::CompletedItemModified {
                task_id: task_id.to_string(),
                item_index: done.index,
            });
        }
    }

    let revision_index = task.plan_revisions.len();
    task.plan_revisions
        .push(PlanRevision::new(revision_index, items, created_by, now));
    task.active_revision_index = revision_index;
    Ok(plan)
}

/// Mark a whole task as done.
pub fn complete_task(
    mut plan: TaskPlan,
    task_id: &str,
    summary: Option<String>,
    now: i64,
) -> Result<TaskPlan, DomainError> {
    let task = plan.task_mut(task_id)?;
    if !task.completed {
        task.completed = true;
        task.completed_at = Some(now);
        task.summary = summary;
    }
    Ok(plan)
}
