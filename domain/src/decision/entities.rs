//! Completion decision entities

use thiserror::Error;

/// Outcome of one forced completion decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionDecision {
    /// The current plan item is done
    Completed { summary: String },
    /// Work on the current plan item continues
    NotCompleted { reasoning: String },
}

impl CompletionDecision {
    pub fn is_completed(&self) -> bool {
        matches!(self, CompletionDecision::Completed { .. })
    }

    /// Status wording used in tool result messages.
    pub fn status_label(&self) -> &'static str {
        match self {
            CompletionDecision::Completed { .. } => "completed",
            CompletionDecision::NotCompleted { .. } => "not completed",
        }
    }

    /// The summary or reasoning text the model gave.
    pub fn text(&self) -> &str {
        match self {
            CompletionDecision::Completed { summary } => summary,
            CompletionDecision::NotCompleted { reasoning } => reasoning,
        }
    }
}

/// The model or gateway broke the forced-choice contract.
///
/// Fatal for the current cycle: no outcome is guessed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("Decision call returned no tool choice")]
    NoChoice,

    #[error("Decision call chose an action outside the allowed set: {0}")]
    UnexpectedAction(String),

    #[error("Action {action} is missing required string argument '{argument}'")]
    MissingArgument { action: String, argument: String },

    #[error("Decision call returned {} tool choices ({}) where exactly one is allowed", .actions.len(), .actions.join(", "))]
    MultipleChoices { actions: Vec<String> },
}
