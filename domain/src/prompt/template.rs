//! Prompt templates for the completion decision

use super::plan::format_plan_prompt;
use crate::decision::{MARK_TASK_COMPLETED, MARK_TASK_NOT_COMPLETED};
use crate::plan::PlanItem;
use crate::session::entities::{Message, Role};

/// Templates for the forced completion-decision call
pub struct CompletionPromptTemplate;

impl CompletionPromptTemplate {
    /// Static instructions for the decision model
    pub fn system() -> String {
        format!(
            r#"You are the progress tracker of an autonomous coding agent.
The agent works through a plan one task at a time. It may take many actions to complete a single task, or a single action.

Analyze the tasks already completed, the tasks remaining, and the current task the agent just acted on.
You are also given the conversation history since the work began: every action taken and any user input.
If the current task is to fix a failing command (a test, build, lint, etc.) and changes were made to fix it, the command must have been re-run successfully before the task counts as complete.

Determine whether the current task is complete, then call exactly one of:
- `{completed}` if the task is complete.
- `{not_completed}` if the task is not complete."#,
            completed = MARK_TASK_COMPLETED,
            not_completed = MARK_TASK_NOT_COMPLETED,
        )
    }

    /// Plan context appended to the system prompt
    pub fn plan_context(items: &[PlanItem]) -> String {
        format!(
            "Here is the plan, along with the summaries of each completed task:\n{}",
            format_plan_prompt(items, true)
        )
    }

    /// Opening user message listing the user's requests
    pub fn history_prefix(history: &[Message]) -> String {
        let requests: Vec<&str> = history
            .iter()
            .filter(|m| m.role == Role::User && !m.hidden)
            .map(|m| m.content.as_str())
            .collect();
        let requests = if requests.is_empty() {
            "(no user request recorded)".to_string()
        } else {
            requests.join("\n\n")
        };
        format!(
            "The following messages contain the full conversation history including the user's request(s).\n\nHere is the user's request(s):\n{}",
            requests
        )
    }

    /// Closing user message restating the forced choice
    pub fn decision_suffix() -> String {
        format!(
            r#"Take all of the messages above, and determine whether or not you have completed the current task in the plan.

You are NOT allowed to take any action other than calling the `{completed}` or `{not_completed}` tool."#,
            completed = MARK_TASK_COMPLETED,
            not_completed = MARK_TASK_NOT_COMPLETED,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_names_both_actions() {
        let system = CompletionPromptTemplate::system();
        assert!(system.contains("`mark_task_completed`"));
        assert!(system.contains("`mark_task_not_completed`"));
    }

    #[test]
    fn test_history_prefix_lists_visible_user_requests() {
        let history = vec![
            Message::user("Fix the flaky test"),
            Message::assistant("On it"),
            Message::user("internal reminder").hidden(),
        ];
        let prefix = CompletionPromptTemplate::history_prefix(&history);
        assert!(prefix.ends_with("Fix the flaky test"));
        assert!(!prefix.contains("internal reminder"));
    }

    #[test]
    fn test_plan_context_includes_current_task() {
        let items = PlanItem::from_steps(["Reproduce"]);
        assert!(CompletionPromptTemplate::plan_context(&items).contains("## Current task\n0. Reproduce"));
    }
}
