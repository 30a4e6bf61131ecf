//! Arbiter parameters — completion decision control.
//!
//! [`ArbiterParams`] groups the static parameters of
//! [`ProgressPlanStepUseCase`](crate::use_cases::progress_plan_step::ProgressPlanStepUseCase).

use serde::{Deserialize, Serialize};

/// Completion decision control parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbiterParams {
    /// History size (estimated tokens) at which summarization is requested.
    pub max_conversation_tokens: usize,
    /// Newest messages excluded from the token count (never summarized).
    pub retain_recent_messages: usize,
    /// Fail the cycle when the model returns several tool calls, instead of
    /// using the first one.
    pub reject_multiple_choices: bool,
    /// Output token cap for the decision call.
    pub max_tokens: Option<u32>,
}

impl Default for ArbiterParams {
    fn default() -> Self {
        Self {
            max_conversation_tokens: 80_000,
            retain_recent_messages: 20,
            reject_multiple_choices: true,
            max_tokens: Some(2_048),
        }
    }
}

impl ArbiterParams {
    // ==================== Builder Methods ====================

    pub fn with_max_conversation_tokens(mut self, max: usize) -> Self {
        self.max_conversation_tokens = max;
        self
    }

    pub fn with_retain_recent_messages(mut self, count: usize) -> Self {
        self.retain_recent_messages = count;
        self
    }

    pub fn with_reject_multiple_choices(mut self, reject: bool) -> Self {
        self.reject_multiple_choices = reject;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = ArbiterParams::default();
        assert_eq!(params.max_conversation_tokens, 80_000);
        assert_eq!(params.retain_recent_messages, 20);
        assert!(params.reject_multiple_choices);
    }

    #[test]
    fn test_builder() {
        let params = ArbiterParams::default()
            .with_max_conversation_tokens(1_000)
            .with_retain_recent_messages(0)
            .with_reject_multiple_choices(false)
            .with_max_tokens(None);

        assert_eq!(params.max_conversation_tokens, 1_000);
        assert_eq!(params.retain_recent_messages, 0);
        assert!(!params.reject_multiple_choices);
        assert!(params.max_tokens.is_none());
    }
}
