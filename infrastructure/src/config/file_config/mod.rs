//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted to domain/application
//! types by the `parse_*`/`to_*` helpers.

mod arbiter;
mod gateway;
mod logging;
mod models;
mod providers;

pub use arbiter::FileArbiterConfig;
pub use gateway::FileGatewayConfig;
pub use logging::FileLoggingConfig;
pub use models::{DEFAULT_DECISION_MODEL, FileModelsConfig};
pub use providers::{
    FileAnthropicConfig, FileGoogleGenAiConfig, FileOpenAiConfig, FileProvidersConfig,
};

use crate::providers::ProviderKind;
use serde::{Deserialize, Serialize};
use stepwise_domain::{ConfigIssue, ConfigIssueCode};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Role-based model selection
    pub models: FileModelsConfig,
    /// Fallback chain and circuit breakers
    pub gateway: FileGatewayConfig,
    /// Provider API settings
    pub providers: FileProvidersConfig,
    /// Completion decision settings
    pub arbiter: FileArbiterConfig,
    /// Decision transcript
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Loading never fails on these; callers decide what to surface.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        let (decision, model_issues) = self.models.parse_decision();
        issues.extend(model_issues);
        if let Some(spec) = decision
            && ProviderKind::from_name(spec.provider()).is_none()
        {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::UnknownProvider,
                format!(
                    "models.decision: no adapter for provider '{}', fallback providers will answer",
                    spec.provider()
                ),
            ));
        }

        issues.extend(self.gateway.validate());
        issues
    }
}
