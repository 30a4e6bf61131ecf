//! Plan rendering for prompts

use crate::plan::PlanItem;
use crate::plan::operations::{completed_plan_items, current_plan_item, remaining_plan_items};

/// Render plan items as completed / current / remaining sections.
///
/// Summaries of completed items are included when `include_summaries` is set.
pub fn format_plan_prompt(items: &[PlanItem], include_summaries: bool) -> String {
    let current = current_plan_item(items);
    let completed = completed_plan_items(items);
    let remaining: Vec<&PlanItem> = remaining_plan_items(items)
        .into_iter()
        .filter(|item| !current.is_some_and(|c| std::ptr::eq(c, *item)))
        .collect();

    let mut out = String::from("## Completed tasks\n");
    if completed.is_empty() {
        out.push_str("(none)\n");
    }
    for item in completed {
        out.push_str(&format!("{}. {}\n", item.index, item.plan));
        if include_summaries && let Some(summary) = &item.summary {
            out.push_str(&format!("   Summary: {}\n", summary));
        }
    }

    out.push_str("\n## Current task\n");
    match current {
        Some(item) => out.push_str(&format!("{}. {}\n", item.index, item.plan)),
        None => out.push_str("(all tasks completed)\n"),
    }

    out.push_str("\n## Remaining tasks\n");
    if remaining.is_empty() {
        out.push_str("(none)\n");
    }
    for item in remaining {
        out.push_str(&format!("{}. {}\n", item.index, item.plan));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<PlanItem> {
        let mut items = PlanItem::from_steps(["Reproduce", "Fix", "Verify"]);
        items[0] = items[0].clone().with_summary("Reproduced locally");
        items
    }

    #[test]
    fn test_sections() {
        let prompt = format_plan_prompt(&items(), true);
        assert_eq!(
            prompt,
            "## Completed tasks\n0. Reproduce\n   Summary: Reproduced locally\n\n\
             ## Current task\n1. Fix\n\n\
             ## Remaining tasks\n2. Verify\n"
        );
    }

    #[test]
    fn test_without_summaries() {
        let prompt = format_plan_prompt(&items(), false);
        assert!(!prompt.contains("Summary:"));
        assert!(prompt.contains("0. Reproduce"));
    }

    #[test]
    fn test_all_done() {
        let done: Vec<PlanItem> = PlanItem::from_steps(["a"])
            .into_iter()
            .map(|i| i.with_summary("ok"))
            .collect();
        let prompt = format_plan_prompt(&done, true);
        assert!(prompt.contains("(all tasks completed)"));
        assert!(prompt.ends_with("## Remaining tasks\n(none)\n"));
    }
}
