//! Completion decision configuration from TOML (`[arbiter]` section)

use serde::{Deserialize, Serialize};
use stepwise_application::ArbiterParams;

/// # Example
///
/// ```toml
/// [arbiter]
/// max_conversation_tokens = 80000
/// retain_recent_messages = 20
/// reject_multiple_choices = true
/// max_tokens = 2048
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileArbiterConfig {
    /// History size (estimated tokens) that triggers summarization
    pub max_conversation_tokens: usize,
    /// Newest messages never counted or summarized
    pub retain_recent_messages: usize,
    /// Fail the cycle when the model returns several choices
    pub reject_multiple_choices: bool,
    /// Output token cap for the decision call
    pub max_tokens: Option<u32>,
}

impl Default for FileArbiterConfig {
    fn default() -> Self {
        let params = ArbiterParams::default();
        Self {
            max_conversation_tokens: params.max_conversation_tokens,
            retain_recent_messages: params.retain_recent_messages,
            reject_multiple_choices: params.reject_multiple_choices,
            max_tokens: params.max_tokens,
        }
    }
}

impl FileArbiterConfig {
    pub fn to_params(&self) -> ArbiterParams {
        ArbiterParams::default()
            .with_max_conversation_tokens(self.max_conversation_tokens)
            .with_retain_recent_messages(self.retain_recent_messages)
            .with_reject_multiple_choices(self.reject_multiple_choices)
            .with_max_tokens(self.max_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_params() {
        assert_eq!(FileArbiterConfig::default().to_params(), ArbiterParams::default());
    }
}
