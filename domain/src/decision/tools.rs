//! The two forced-choice decision actions and their parsing

use super::entities::{CompletionDecision, ContractViolation};
use crate::tool::entities::{ToolCall, ToolDefinition, ToolParameter};
use tracing::warn;

pub const MARK_TASK_COMPLETED: &str = "mark_task_completed";
pub const MARK_TASK_NOT_COMPLETED: &str = "mark_task_not_completed";

pub const COMPLETED_SUMMARY_ARG: &str = "completed_task_summary";
pub const REASONING_ARG: &str = "reasoning";

/// The only actions permitted in a completion-decision call.
pub fn decision_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            MARK_TASK_NOT_COMPLETED,
            "Mark the current task as not completed, explaining what work remains.",
        )
        .with_parameter(ToolParameter::new(
            REASONING_ARG,
            "A concise explanation of why the current task is not yet complete.",
            true,
        )),
        ToolDefinition::new(
            MARK_TASK_COMPLETED,
            "Mark the current task as completed, with a summary of the work done.",
        )
        .with_parameter(ToolParameter::new(
            COMPLETED_SUMMARY_ARG,
            "A summary of the actions taken to complete the current task, including \
             any context or insights useful for the remaining tasks.",
            true,
        )),
    ]
}

fn required_arg(call: &ToolCall, argument: &str) -> Result<String, ContractViolation> {
    call.get_string(argument)
        .map(str::to_string)
        .ok_or_else(|| ContractViolation::MissingArgument {
            action: call.tool_name.clone(),
            argument: argument.to_string(),
        })
}

/// Interpret a single tool call as a decision.
pub fn parse_decision(call: &ToolCall) -> Result<CompletionDecision, ContractViolation> {
    match call.tool_name.as_str() {
        MARK_TASK_COMPLETED => Ok(CompletionDecision::Completed {
            summary: required_arg(call, COMPLETED_SUMMARY_ARG)?,
        }),
        MARK_TASK_NOT_COMPLETED => Ok(CompletionDecision::NotCompleted {
            reasoning: required_arg(call, REASONING_ARG)?,
        }),
        other => Err(ContractViolation::UnexpectedAction(other.to_string())),
    }
}

/// Pick the decision out of the tool calls of a forced-choice response.
///
/// Several calls are always logged as an anomaly. With `reject_multiple` the
/// cycle fails; otherwise the first call is used.
pub fn select_decision(
    calls: &[ToolCall],
    reject_multiple: bool,
) -> Result<(CompletionDecision, &ToolCall), ContractViolation> {
    let first = calls.first().ok_or(ContractViolation::NoChoice)?;

    if calls.len() > 1 {
        let actions: Vec<String> = calls.iter().map(|c| c.tool_name.clone()).collect();
        warn!(
            count = calls.len(),
            actions = ?actions,
            "Decision call returned several tool choices"
        );
        if reject_multiple {
            return Err(ContractViolation::MultipleChoices { actions });
        }
    }

    Ok((parse_decision(first)?, first))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(summary: &str) -> ToolCall {
        ToolCall::new(MARK_TASK_COMPLETED).with_arg(COMPLETED_SUMMARY_ARG, summary)
    }

    fn not_completed(reasoning: &str) -> ToolCall {
        ToolCall::new(MARK_TASK_NOT_COMPLETED).with_arg(REASONING_ARG, reasoning)
    }

    #[test]
    fn test_decision_tools() {
        let tools = decision_tools();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![MARK_TASK_NOT_COMPLETED, MARK_TASK_COMPLETED]);
        assert!(tools.iter().all(|t| t.required_parameters().count() == 1));
    }

    #[test]
    fn test_parse_both_actions() {
        assert_eq!(
            parse_decision(&completed("Fixed")).unwrap(),
            CompletionDecision::Completed {
                summary: "Fixed".to_string()
            }
        );
        assert_eq!(
            parse_decision(&not_completed("Still red")).unwrap(),
            CompletionDecision::NotCompleted {
                reasoning: "Still red".to_string()
            }
        );
    }

    #[test]
    fn test_unexpected_action() {
        let err = parse_decision(&ToolCall::new("run_command")).unwrap_err();
        assert_eq!(err, ContractViolation::UnexpectedAction("run_command".to_string()));
    }

    #[test]
    fn test_missing_argument() {
        let err = parse_decision(&ToolCall::new(MARK_TASK_COMPLETED)).unwrap_err();
        assert_eq!(
            err,
            ContractViolation::MissingArgument {
                action: MARK_TASK_COMPLETED.to_string(),
                argument: COMPLETED_SUMMARY_ARG.to_string()
            }
        );
    }

    #[test]
    fn test_no_choice() {
        assert_eq!(select_decision(&[], true).unwrap_err(), ContractViolation::NoChoice);
    }

    #[test]
    fn test_two_choices_rejected() {
        let calls = vec![completed("done"), not_completed("not done")];
        let err = select_decision(&calls, true).unwrap_err();
        assert!(matches!(err, ContractViolation::MultipleChoices { ref actions } if actions.len() == 2));
    }

    #[test]
    fn test_two_choices_first_wins_when_allowed() {
        let calls = vec![not_completed("not done"), completed("done")];
        let (decision, call) = select_decision(&calls, false).unwrap();
        assert!(!decision.is_completed());
        assert_eq!(call.tool_name, MARK_TASK_NOT_COMPLETED);
    }
}
