//! Progress notification port
//!
//! Defines the interface for reporting progress during a decision cycle.

use stepwise_domain::{CompletionDecision, ModelSpec, PlanItem};

/// Callback for progress updates during a decision cycle
///
/// Implementations live in the presentation layer (spinner, plain text).
pub trait ProgressNotifier: Send + Sync {
    /// Called before the decision model is invoked
    fn on_decision_start(&self, model: &ModelSpec, item: Option<&PlanItem>);

    /// Called once the model answered, `None` when the answer was unusable
    fn on_decision_complete(&self, decision: Option<&CompletionDecision>);

    /// Called after a plan mutation was written (or failed to be written)
    fn on_checkpoint(&self, _persisted: bool) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_decision_start(&self, _model: &ModelSpec, _item: Option<&PlanItem>) {}
    fn on_decision_complete(&self, _decision: Option<&CompletionDecision>) {}
}
