//! Provider API settings from TOML (`[providers.*]` sections)
//!
//! Keys are read from the environment variable named by `api_key_env`
//! unless `api_key` is set inline. A provider without a key is left out of
//! the fallback chain.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAnthropicConfig {
    pub api_key_env: String,
    pub api_key: Option<String>,
    /// Messages API host; `/v1/messages` is appended
    pub base_url: String,
    pub max_tokens: u32,
    /// Sent as the `anthropic-version` header
    pub api_version: String,
}

impl Default for FileAnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 8192,
            api_version: "2023-06-01".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGoogleGenAiConfig {
    pub api_key_env: String,
    pub api_key: Option<String>,
    /// `/v1beta/models/<model>:generateContent` is appended
    pub base_url: String,
    pub max_tokens: u32,
}

impl Default for FileGoogleGenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GOOGLE_API_KEY".to_string(),
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            max_tokens: 8192,
        }
    }
}

/// Also covers Chat Completions compatible gateways via `base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOpenAiConfig {
    pub api_key_env: String,
    pub api_key: Option<String>,
    /// `/v1/chat/completions` is appended
    pub base_url: String,
    pub max_tokens: u32,
}

impl Default for FileOpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 8192,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProvidersConfig {
    pub anthropic: FileAnthropicConfig,
    pub google_genai: FileGoogleGenAiConfig,
    pub openai: FileOpenAiConfig,
}
