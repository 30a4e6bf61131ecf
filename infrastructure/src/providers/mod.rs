//! Model providers and the fallback gateway.
//!
//! Each [`ProviderAdapter`] speaks one vendor API. [`FallbackGateway`]
//! implements the application's `LlmGateway` port on top of them: it walks
//! a fallback chain and consults the shared [`ProviderHealthRegistry`]
//! before every attempt.

pub mod anthropic;
pub mod fallback;
pub mod google_genai;
pub mod health;
pub mod openai;
mod schema;

pub use anthropic::AnthropicProvider;
pub use fallback::FallbackGateway;
pub use google_genai::GoogleGenAiProvider;
pub use health::{BreakerConfig, CircuitBreaker, CircuitState, ProviderHealth, ProviderHealthRegistry};
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use stepwise_application::ports::llm_gateway::{GatewayError, ModelRequest};
use stepwise_domain::LlmResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Anthropic,
    GoogleGenAi,
    OpenAi,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Anthropic,
        ProviderKind::GoogleGenAi,
        ProviderKind::OpenAi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::GoogleGenAi => "google-genai",
            ProviderKind::OpenAi => "openai",
        }
    }

    /// Map a configured provider name to an adapter kind.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "anthropic" => Some(ProviderKind::Anthropic),
            "google-genai" | "google_genai" | "gemini" => Some(ProviderKind::GoogleGenAi),
            "openai" => Some(ProviderKind::OpenAi),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One vendor API.
///
/// `invoke` receives the bare model name (without the provider prefix); the
/// request's own `model` field is the caller's preference and is ignored.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn invoke(&self, model: &str, request: &ModelRequest)
    -> Result<LlmResponse, GatewayError>;
}

/// Map a non-success HTTP status to a gateway error.
pub(crate) fn http_error(provider: ProviderKind, status: u16, body: &str) -> GatewayError {
    let message = stepwise_domain::util::one_line(body, 500);
    match status {
        401 | 403 => GatewayError::NotConfigured(format!("{}: authentication failed ({})", provider, message)),
        404 => GatewayError::ModelNotAvailable(format!("{}: {}", provider, message)),
        _ => GatewayError::ApiError { status, message },
    }
}

/// Resolve an API key: explicit value first, then the named environment variable.
pub(crate) fn resolve_api_key(explicit: Option<&str>, env_var: &str) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok())
        .filter(|key| !key.trim().is_empty())
}
