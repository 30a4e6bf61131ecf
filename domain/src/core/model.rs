//! Model spec value object (`provider:model`)

use super::error::DomainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A model addressed through a specific provider (Value Object)
///
/// Written as `provider:model`, e.g. `anthropic:claude-sonnet-4-0`.
/// Everything after the first `:` belongs to the model name, so
/// `openai:ft:gpt-4o:team` keeps its colons. The full string doubles as the
/// key for provider health tracking and per-model token accounting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelSpec {
    provider: String,
    model: String,
}

impl ModelSpec {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The `provider:model` key.
    pub fn key(&self) -> String {
        format!("{}:{}", self.provider, self.model)
    }
}

impl std::fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

impl std::str::FromStr for ModelSpec {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((provider, model)) = s.split_once(':') else {
            return Err(DomainError::InvalidModelSpec(s.to_string()));
        };
        let provider = provider.trim();
        let model = model.trim();
        if provider.is_empty() || model.is_empty() {
            return Err(DomainError::InvalidModelSpec(s.to_string()));
        }
        Ok(Self::new(provider, model))
    }
}

impl Serialize for ModelSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.key())
    }
}

impl<'de> Deserialize<'de> for ModelSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_and_model() {
        let spec: ModelSpec = "anthropic:claude-sonnet-4-0".parse().unwrap();
        assert_eq!(spec.provider(), "anthropic");
        assert_eq!(spec.model(), "claude-sonnet-4-0");
        assert_eq!(spec.to_string(), "anthropic:claude-sonnet-4-0");
    }

    #[test]
    fn test_model_name_keeps_colons() {
        let spec: ModelSpec = "openai:ft:gpt-4o:team".parse().unwrap();
        assert_eq!(spec.provider(), "openai");
        assert_eq!(spec.model(), "ft:gpt-4o:team");
    }

    #[test]
    fn test_rejects_missing_parts() {
        assert!("claude-sonnet-4-0".parse::<ModelSpec>().is_err());
        assert!(":gpt-4o".parse::<ModelSpec>().is_err());
        assert!("openai:".parse::<ModelSpec>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let spec = ModelSpec::new("openai", "gpt-4o");
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(json, "\"openai:gpt-4o\"");
        let back: ModelSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
