//! Progress reporting for decision cycles

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use stepwise_application::ports::progress::ProgressNotifier;
use stepwise_domain::util::one_line;
use stepwise_domain::{CompletionDecision, ModelSpec, PlanItem};

/// Reports progress with a spinner while the decision model is thinking
pub struct ProgressReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn take_spinner(&self) -> Option<ProgressBar> {
        self.spinner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn item_label(item: Option<&PlanItem>) -> String {
    match item {
        Some(item) => format!("#{} {}", item.index, one_line(&item.plan, 60)),
        None => "all items done".to_string(),
    }
}

fn decision_label(decision: Option<&CompletionDecision>) -> String {
    match decision {
        Some(CompletionDecision::Completed { .. }) => format!("{} completed", "v".green()),
        Some(CompletionDecision::NotCompleted { .. }) => {
            format!("{} not completed", "-".yellow())
        }
        None => format!("{} no usable decision", "x".red()),
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_decision_start(&self, model: &ModelSpec, item: Option<&PlanItem>) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_prefix(model.to_string());
        pb.set_message(format!("Deciding {}", item_label(item)));
        pb.enable_steady_tick(Duration::from_millis(100));

        if let Some(previous) = self
            .spinner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(pb)
        {
            previous.finish_and_clear();
        }
    }

    fn on_decision_complete(&self, decision: Option<&CompletionDecision>) {
        if let Some(pb) = self.take_spinner() {
            pb.finish_with_message(decision_label(decision));
        }
    }

    fn on_checkpoint(&self, persisted: bool) {
        if persisted {
            eprintln!("  {} checkpoint written", "v".green());
        } else {
            eprintln!("  {} checkpoint not written", "x".red());
        }
    }
}

/// Simple text-based progress (no spinner)
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_decision_start(&self, model: &ModelSpec, item: Option<&PlanItem>) {
        eprintln!("{} {} ({})", "->".cyan(), item_label(item).bold(), model);
    }

    fn on_decision_complete(&self, decision: Option<&CompletionDecision>) {
        eprintln!("  {}", decision_label(decision));
    }

    fn on_checkpoint(&self, persisted: bool) {
        if !persisted {
            eprintln!("  {} checkpoint not written", "x".red());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_label_truncates_long_plans() {
        let item = PlanItem::new(2, "Refactor the parser\nand add tests ".repeat(10));
        let label = item_label(Some(&item));
        assert!(label.starts_with("#2 Refactor the parser"));
        assert!(!label.contains('\n'));
        assert!(label.len() < 80);
        assert_eq!(item_label(None), "all items done");
    }

    #[test]
    fn test_reporter_lifecycle_without_terminal() {
        let reporter = ProgressReporter::new();
        let model: ModelSpec = "anthropic:claude-sonnet-4-0".parse().unwrap();
        reporter.on_decision_start(&model, Some(&PlanItem::new(0, "Reproduce")));
        reporter.on_decision_start(&model, None);
        reporter.on_decision_complete(Some(&CompletionDecision::NotCompleted {
            reasoning: "Tests still failing".to_string(),
        }));
        assert!(reporter.take_spinner().is_none());
    }
}
