//! Console output formatter for plans, usage and decision outcomes

use colored::Colorize;
use serde_json::{Value, json};
use stepwise_application::{CheckpointSnapshot, CheckpointStatus, DocumentId, ProgressPlanStepOutput};
use stepwise_domain::checkpoint::ProposedPlan;
use stepwise_domain::plan::current_plan_item;
use stepwise_domain::{CompletionDecision, ConfigIssue, ModelTokenData, Task, TaskPlan};

/// Formats checkpoint contents and decision outcomes for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format everything a document records
    pub fn format_snapshot(id: &DocumentId, snapshot: &CheckpointSnapshot) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Agent Context"));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Document:".cyan().bold(), id));

        output.push_str(&Self::section_header("Task Plan"));
        match &snapshot.task_plan {
            Some(plan) if !plan.is_empty() => output.push_str(&Self::format_task_plan(plan)),
            _ => output.push_str(&format!("{}\n", "(no task plan)".dimmed())),
        }

        if let Some(proposed) = &snapshot.proposed_plan {
            output.push_str(&Self::section_header("Proposed Plan"));
            output.push_str(&Self::format_proposed_plan(proposed));
        }

        output.push_str(&Self::section_header("Token Usage"));
        match &snapshot.token_data {
            Some(entries) if !entries.is_empty() => {
                output.push_str(&Self::format_token_data(entries))
            }
            _ => output.push_str(&format!("{}\n", "(no usage recorded)".dimmed())),
        }

        output.push_str(&Self::footer());
        output
    }

    pub fn format_snapshot_json(snapshot: &CheckpointSnapshot) -> String {
        let value = json!({
            "taskPlan": snapshot.task_plan,
            "proposedPlan": snapshot.proposed_plan,
            "tokenData": snapshot.token_data,
        });
        Self::pretty(&value)
    }

    /// Format every task, marking the active one
    pub fn format_task_plan(plan: &TaskPlan) -> String {
        let mut output = String::new();
        for task in &plan.tasks {
            let active = task.task_index == plan.active_task_index;
            output.push_str(&Self::format_task(task, active));
        }
        output
    }

    fn format_task(task: &Task, active: bool) -> String {
        let title = task.title.as_deref().unwrap_or(&task.request);
        let marker = if active { "*".green().bold() } else { " ".normal() };
        let status = if task.completed {
            "done".green()
        } else {
            "open".yellow()
        };

        let mut output = format!(
            "\n{} {} [{}] {}\n",
            marker,
            format!("Task {}", task.task_index).bold(),
            status,
            stepwise_domain::util::one_line(title, 72)
        );

        let Ok(revision) = task.active_revision() else {
            output.push_str(&format!("    {}\n", "(active revision missing)".red()));
            return output;
        };
        output.push_str(&format!(
            "    {}\n",
            format!(
                "revision {} of {} by {}",
                revision.revision_index + 1,
                task.plan_revisions.len(),
                revision.created_by.as_str()
            )
            .dimmed()
        ));

        let items = revision.sorted_items();
        let current = current_plan_item(&items).map(|item| item.index);
        for item in &items {
            let line = format!("{}. {}", item.index, item.plan);
            if item.completed {
                output.push_str(&format!("    {} {}\n", "v".green(), line));
                if let Some(summary) = &item.summary {
                    output.push_str(&Self::indent(summary, "        "));
                    output.push('\n');
                }
            } else if Some(item.index) == current {
                output.push_str(&format!("    {} {}\n", ">".cyan().bold(), line.bold()));
            } else {
                output.push_str(&format!("      {}\n", line));
            }
        }

        if let Some(summary) = &task.summary {
            output.push_str(&format!("    {} {}\n", "Summary:".cyan(), summary));
        }
        output
    }

    pub fn format_proposed_plan(proposed: &ProposedPlan) -> String {
        if proposed.is_empty() {
            return format!("{}\n", "(empty)".dimmed());
        }
        proposed
            .steps()
            .iter()
            .enumerate()
            .map(|(i, step)| format!("  {}. {}\n", i, step))
            .collect()
    }

    /// Format the usage ledger as a table with a total row
    pub fn format_token_data(entries: &[ModelTokenData]) -> String {
        let mut output = format!(
            "{:<36} {:>10} {:>10} {:>10} {:>10}\n",
            "model".bold(),
            "input".bold(),
            "output".bold(),
            "cache rd".bold(),
            "cache wr".bold()
        );

        let mut total = ModelTokenData::new("total");
        for entry in entries {
            output.push_str(&Self::token_row(entry));
            total.accumulate(entry);
        }
        if entries.len() > 1 {
            output.push_str(&format!("{}\n", "-".repeat(80).dimmed()));
            output.push_str(&Self::token_row(&total));
        }
        output
    }

    fn token_row(entry: &ModelTokenData) -> String {
        format!(
            "{:<36} {:>10} {:>10} {:>10} {:>10}\n",
            entry.model,
            entry.input_tokens,
            entry.output_tokens,
            entry.cache_read_input_tokens,
            entry.cache_creation_input_tokens
        )
    }

    /// Format the result of one decision cycle
    pub fn format_outcome(output: &ProgressPlanStepOutput) -> String {
        let mut text = String::new();

        let (label, heading) = match &output.decision {
            CompletionDecision::Completed { .. } => ("Completed".green().bold(), "Summary:"),
            CompletionDecision::NotCompleted { .. } => {
                ("Not completed".yellow().bold(), "Reasoning:")
            }
        };
        text.push_str(&format!("{} {}\n", "Decision:".cyan().bold(), label));
        text.push_str(&format!("{}\n", heading.cyan()));
        text.push_str(&Self::indent(output.decision.text(), "  "));
        text.push('\n');

        if let Some(index) = output.completed_item {
            text.push_str(&format!("{} item {}\n", "Marked done:".cyan().bold(), index));
        }
        text.push_str(&format!(
            "{} {}\n",
            "Next stage:".cyan().bold(),
            output.next_stage
        ));
        text.push_str(&format!(
            "{} ~{} tokens\n",
            "History:".cyan().bold(),
            output.conversation_tokens
        ));

        match &output.checkpoint {
            CheckpointStatus::Skipped => {}
            CheckpointStatus::Persisted => {
                text.push_str(&format!("{} written\n", "Checkpoint:".cyan().bold()))
            }
            CheckpointStatus::Failed(reason) => text.push_str(&format!(
                "{} {} ({})\n",
                "Checkpoint:".cyan().bold(),
                "not written".red(),
                reason
            )),
        }

        if let Ok(items) = stepwise_domain::plan::active_plan_items(&output.plan)
            && output.completed_item.is_some()
        {
            text.push_str(&Self::section_header("Plan"));
            text.push_str(&stepwise_domain::format_plan_prompt(&items, false));
        }
        text
    }

    pub fn format_outcome_json(output: &ProgressPlanStepOutput) -> String {
        let (status, key) = match &output.decision {
            CompletionDecision::Completed { .. } => ("completed", "summary"),
            CompletionDecision::NotCompleted { .. } => ("not_completed", "reasoning"),
        };
        let checkpoint = match &output.checkpoint {
            CheckpointStatus::Skipped => json!({ "status": "skipped" }),
            CheckpointStatus::Persisted => json!({ "status": "persisted" }),
            CheckpointStatus::Failed(reason) => json!({ "status": "failed", "error": reason }),
        };
        let value = json!({
            "decision": { "status": status, key: output.decision.text() },
            "nextStage": output.next_stage.as_str(),
            "completedItem": output.completed_item,
            "conversationTokens": output.conversation_tokens,
            "checkpoint": checkpoint,
            "taskPlan": output.plan,
        });
        Self::pretty(&value)
    }

    /// Format configuration issues, errors first
    pub fn format_issues(issues: &[ConfigIssue]) -> String {
        let mut sorted: Vec<&ConfigIssue> = issues.iter().collect();
        sorted.sort_by_key(|issue| !issue.is_error());
        sorted
            .into_iter()
            .map(|issue| {
                let tag = if issue.is_error() {
                    "error".red().bold()
                } else {
                    "warning".yellow().bold()
                };
                format!("{}: {}\n", tag, issue.message)
            })
            .collect()
    }

    fn pretty(value: &Value) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    pub(crate) fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_domain::plan::{complete_plan_item, create_task_plan};
    use stepwise_domain::PlanItem;

    fn plan() -> TaskPlan {
        let plan = create_task_plan(
            "Fix the flaky test",
            PlanItem::from_steps(["Reproduce", "Fix", "Verify"]),
            1_720_000_000_000,
        );
        let task_id = plan.tasks[0].id.clone();
        complete_plan_item(plan, &task_id, 0, "Reproduced locally").unwrap()
    }

    #[test]
    fn test_task_plan_marks_current_item() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format_task_plan(&plan());
        assert!(text.contains("Task 0 [open] Fix the flaky test"));
        assert!(text.contains("v 0. Reproduce"));
        assert!(text.contains("Reproduced locally"));
        assert!(text.contains("> 1. Fix"));
        assert!(text.contains("  2. Verify"));
    }

    #[test]
    fn test_token_table_has_total_row_for_several_models() {
        colored::control::set_override(false);
        let mut a = ModelTokenData::new("anthropic:claude-sonnet-4-0");
        a.input_tokens = 100;
        a.output_tokens = 20;
        let mut b = ModelTokenData::new("openai:gpt-4o");
        b.input_tokens = 50;
        b.output_tokens = 5;

        let text = ConsoleFormatter::format_token_data(&[a.clone(), b]);
        let total = text.lines().last().unwrap();
        assert!(total.starts_with("total"));
        assert!(total.contains("150"));
        assert!(total.contains("25"));

        let single = ConsoleFormatter::format_token_data(&[a]);
        assert!(!single.contains("total"));
    }

    #[test]
    fn test_snapshot_without_payloads() {
        colored::control::set_override(false);
        let id: DocumentId = "mem:scratch".parse().unwrap();
        let text = ConsoleFormatter::format_snapshot(&id, &CheckpointSnapshot::default());
        assert!(text.contains("(no task plan)"));
        assert!(text.contains("(no usage recorded)"));
        assert!(!text.contains("Proposed Plan"));
    }

    #[test]
    fn test_snapshot_json_uses_checkpoint_field_names() {
        let snapshot = CheckpointSnapshot {
            task_plan: Some(plan()),
            proposed_plan: Some(ProposedPlan(vec!["Ship".to_string()])),
            token_data: None,
        };
        let value: Value =
            serde_json::from_str(&ConsoleFormatter::format_snapshot_json(&snapshot)).unwrap();
        assert_eq!(value["proposedPlan"][0], "Ship");
        assert_eq!(value["taskPlan"]["tasks"][0]["planRevisions"][0]["plans"][1]["plan"], "Fix");
        assert!(value["tokenData"].is_null());
    }

    #[test]
    fn test_issues_list_errors_first() {
        colored::control::set_override(false);
        use stepwise_domain::ConfigIssueCode;
        let issues = vec![
            ConfigIssue::warning(ConfigIssueCode::UnknownProvider, "skipped google-genai"),
            ConfigIssue::error(ConfigIssueCode::EmptyFallbackOrder, "no usable provider"),
        ];
        let text = ConsoleFormatter::format_issues(&issues);
        assert_eq!(
            text,
            "error: no usable provider\nwarning: skipped google-genai\n"
        );
    }
}
