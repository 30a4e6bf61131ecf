//! Port for structured decision logging.
//!
//! [`ConversationLogger`] records what the arbiter decided and why (decision
//! text, plan mutations, checkpoint failures) to a machine-readable log.
//! This is separate from `tracing` diagnostics.

use serde_json::Value;

/// Event type names written by the arbiter.
pub mod events {
    pub const COMPLETION_DECISION: &str = "completion_decision";
    pub const PLAN_ITEM_COMPLETED: &str = "plan_item_completed";
    pub const CHECKPOINT_FAILED: &str = "checkpoint_failed";
    pub const CONTRACT_VIOLATION: &str = "contract_violation";
}

/// A structured event for logging.
#[derive(Debug, Clone)]
pub struct ConversationEvent {
    /// Event type identifier (see [`events`]).
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging events to a structured log.
///
/// `log` is synchronous and infallible; implementations swallow their own
/// write failures.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
