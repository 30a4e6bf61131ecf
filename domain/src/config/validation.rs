//! Configuration issues reported by validation.
//!
//! Validation never aborts loading; it returns structured issues with a
//! severity so callers decide what to surface.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A model string is not in `provider:model` form.
    InvalidModelSpec,
    /// A provider name has no adapter.
    UnknownProvider,
    /// The fallback order lists no provider.
    EmptyFallbackOrder,
    /// A provider in the fallback order has no default model.
    MissingDefaultModel,
    /// The breaker would open before any failure is recorded.
    ZeroFailureThreshold,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let issue = ConfigIssue::error(ConfigIssueCode::InvalidModelSpec, "bad");
        assert!(issue.is_error());
        let issue = ConfigIssue::warning(ConfigIssueCode::UnknownProvider, "google-genai");
        assert!(!issue.is_error());
        assert_eq!(issue.severity.to_string(), "warning");
    }
}
