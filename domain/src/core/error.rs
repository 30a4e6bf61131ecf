//! Domain error types

use thiserror::Error;

/// Domain-level errors raised by plan operations.
///
/// All lookups fail explicitly: an out-of-range `activeTaskIndex` or
/// `activeRevisionIndex` is reported, never clamped or guessed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Task plan has no tasks")]
    EmptyPlan,

    #[error("Active task index {index} is out of range ({len} tasks)")]
    ActiveTaskOutOfRange { index: usize, len: usize },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Plan revision {revision_index} not found for task {task_id}")]
    RevisionNotFound {
        task_id: String,
        revision_index: usize,
    },

    #[error("Plan item {item_index} not found in the active revision of task {task_id}")]
    PlanItemNotFound { task_id: String, item_index: usize },

    #[error("Completed plan item {item_index} of task {task_id} cannot be changed")]
    CompletedItemModified { task_id: String, item_index: usize },

    #[error("Invalid model spec: {0}")]
    InvalidModelSpec(String),
}

impl DomainError {
    /// Check if this error is a failed lookup (task, revision or item).
    ///
    /// Callers treat these as "no prior state" or "skip this cycle".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::EmptyPlan
                | DomainError::ActiveTaskOutOfRange { .. }
                | DomainError::TaskNotFound(_)
                | DomainError::RevisionNotFound { .. }
                | DomainError::PlanItemNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let error = DomainError::PlanItemNotFound {
            task_id: "task-1".to_string(),
            item_index: 4,
        };
        assert_eq!(
            error.to_string(),
            "Plan item 4 not found in the active revision of task task-1"
        );
    }

    #[test]
    fn test_is_not_found_check() {
        assert!(DomainError::EmptyPlan.is_not_found());
        assert!(DomainError::TaskNotFound("x".to_string()).is_not_found());
        assert!(
            DomainError::ActiveTaskOutOfRange { index: 3, len: 1 }.is_not_found()
        );
        assert!(
            !DomainError::CompletedItemModified {
                task_id: "x".to_string(),
                item_index: 0
            }
            .is_not_found()
        );
        assert!(!DomainError::InvalidModelSpec("".to_string()).is_not_found());
    }
}
