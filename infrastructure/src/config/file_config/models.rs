//! Role-based model configuration from TOML (`[models]` section)

use serde::{Deserialize, Serialize};
use stepwise_domain::{ConfigIssue, ConfigIssueCode, ModelSpec};

/// Decision model used when none is configured.
pub const DEFAULT_DECISION_MODEL: &str = "anthropic:claude-sonnet-4-0";

/// Model configuration from TOML
///
/// # Example
///
/// ```toml
/// [models]
/// decision = "anthropic:claude-sonnet-4-0"   # Completion decisions
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelsConfig {
    /// Model judging whether the current plan item is done (`provider:model`)
    pub decision: String,
}

impl Default for FileModelsConfig {
    fn default() -> Self {
        Self {
            decision: DEFAULT_DECISION_MODEL.to_string(),
        }
    }
}

impl FileModelsConfig {
    /// Parse the decision model, collecting an issue when it is malformed.
    pub fn parse_decision(&self) -> (Option<ModelSpec>, Vec<ConfigIssue>) {
        match self.decision.parse::<ModelSpec>() {
            Ok(spec) => (Some(spec), Vec::new()),
            Err(_) => (
                None,
                vec![ConfigIssue::error(
                    ConfigIssueCode::InvalidModelSpec,
                    format!(
                        "models.decision: '{}' is not in provider:model form",
                        self.decision
                    ),
                )],
            ),
        }
    }
}
