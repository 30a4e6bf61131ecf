//! Model gateway configuration from TOML (`[gateway]` section)

use crate::providers::{BreakerConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use stepwise_domain::{ConfigIssue, ConfigIssueCode};

/// Fallback and circuit breaker settings.
///
/// # Example
///
/// ```toml
/// [gateway]
/// fallback_order = ["anthropic", "google-genai", "openai"]
/// failure_threshold = 3
/// timeout_ms = 300000
/// attempt_timeout_secs = 120
///
/// [gateway.default_models]
/// anthropic = "claude-sonnet-4-0"
/// google-genai = "gemini-2.5-pro"
/// openai = "gpt-4o"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGatewayConfig {
    /// Providers tried after the requested one, in order
    pub fallback_order: Vec<String>,
    /// Consecutive failures before a provider's circuit opens
    pub failure_threshold: u32,
    /// How long an open circuit waits before a trial call (milliseconds)
    pub timeout_ms: u64,
    /// Per-attempt deadline; a timed-out attempt counts as a failure
    pub attempt_timeout_secs: Option<u64>,
    /// Model used when falling back to a provider
    pub default_models: BTreeMap<String, String>,
}

impl Default for FileGatewayConfig {
    fn default() -> Self {
        Self {
            fallback_order: vec![
                "anthropic".to_string(),
                "google-genai".to_string(),
                "openai".to_string(),
            ],
            failure_threshold: 3,
            timeout_ms: 300_000,
            attempt_timeout_secs: Some(120),
            default_models: BTreeMap::from([
                ("anthropic".to_string(), "claude-sonnet-4-0".to_string()),
                ("google-genai".to_string(), "gemini-2.5-pro".to_string()),
                ("openai".to_string(), "gpt-4o".to_string()),
            ]),
        }
    }
}

impl FileGatewayConfig {
    /// Resolve provider names, collecting issues for names without an adapter.
    pub fn parse_fallback_order(&self) -> (Vec<ProviderKind>, Vec<ConfigIssue>) {
        let mut kinds = Vec::new();
        let mut issues = Vec::new();

        for name in &self.fallback_order {
            match ProviderKind::from_name(name) {
                Some(kind) if !kinds.contains(&kind) => kinds.push(kind),
                Some(_) => {}
                None => issues.push(ConfigIssue::warning(
                    ConfigIssueCode::UnknownProvider,
                    format!("gateway.fallback_order: no adapter for provider '{}', skipped", name),
                )),
            }
        }

        if kinds.is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyFallbackOrder,
                "gateway.fallback_order: no usable provider",
            ));
        }

        for kind in &kinds {
            if self.default_model(*kind).is_none() {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::MissingDefaultModel,
                    format!(
                        "gateway.default_models: no model for '{}', it can only serve requests addressed to it",
                        kind
                    ),
                ));
            }
        }

        (kinds, issues)
    }

    pub fn default_model(&self, kind: ProviderKind) -> Option<&str> {
        self.default_models
            .get(kind.as_str())
            .map(String::as_str)
            .filter(|m| !m.trim().is_empty())
    }

    pub fn breaker_config(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.failure_threshold,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = self.parse_fallback_order().1;
        if self.failure_threshold == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroFailureThreshold,
                "gateway.failure_threshold: 0 is treated as 1",
            ));
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FileGatewayConfig::default();
        let (kinds, issues) = config.parse_fallback_order();
        assert_eq!(
            kinds,
            vec![ProviderKind::Anthropic, ProviderKind::GoogleGenAi, ProviderKind::OpenAi]
        );
        assert!(issues.is_empty());
        assert_eq!(config.breaker_config(), BreakerConfig::default());
        assert_eq!(config.attempt_timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_unknown_provider_is_skipped_with_warning() {
        let config = FileGatewayConfig {
            fallback_order: vec![
                "anthropic".to_string(),
                "mistral".to_string(),
                "anthropic".to_string(),
            ],
            ..FileGatewayConfig::default()
        };
        let (kinds, issues) = config.parse_fallback_order();
        assert_eq!(kinds, vec![ProviderKind::Anthropic]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ConfigIssueCode::UnknownProvider);
        assert!(!issues[0].is_error());
    }

    #[test]
    fn test_empty_order_is_an_error() {
        let config = FileGatewayConfig {
            fallback_order: vec![],
            ..FileGatewayConfig::default()
        };
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.code == ConfigIssueCode::EmptyFallbackOrder && i.is_error()));
    }

    #[test]
    fn test_zero_threshold_and_timeout() {
        let config = FileGatewayConfig {
            failure_threshold: 0,
            attempt_timeout_secs: Some(0),
            ..FileGatewayConfig::default()
        };
        assert!(config.validate().iter().any(|i| i.code == ConfigIssueCode::ZeroFailureThreshold));
        assert_eq!(config.attempt_timeout(), None);
    }
}
