//! LLM Gateway port
//!
//! Defines the interface for invoking a language model. The application
//! layer only sees this trait; provider selection, fallback and circuit
//! breaking live behind it in the infrastructure layer.

use async_trait::async_trait;
use stepwise_domain::{LlmResponse, Message, ModelSpec, ToolDefinition};
use thiserror::Error;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Timeout")]
    Timeout,

    #[error("All providers failed (tried {}); last error: {last}", .attempts.join(", "))]
    AllProvidersFailed {
        attempts: Vec<String>,
        last: Box<GatewayError>,
    },

    #[error("All provider circuits are open (skipped {})", .skipped.join(", "))]
    AllCircuitsOpen { skipped: Vec<String> },

    #[error("Other error: {0}")]
    Other(String),
}

impl GatewayError {
    /// The innermost provider error, unwrapping fallback aggregation.
    pub fn root(&self) -> &GatewayError {
        match self {
            GatewayError::AllProvidersFailed { last, .. } => last.root(),
            other => other,
        }
    }
}

/// How the model may use the offered tools
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolChoice {
    /// The model decides whether to call a tool
    #[default]
    Auto,
    /// The model must call one of the offered tools
    Any,
    /// The model must call this tool
    Tool(String),
    /// Tools are described but must not be called
    None,
}

/// A single model invocation.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Preferred model; the gateway may fall back to other providers
    pub model: ModelSpec,
    /// System prompt segments, sent in order
    pub system: Vec<String>,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
    /// Whether the model may return several tool calls at once
    pub parallel_tool_calls: bool,
    pub max_tokens: Option<u32>,
}

impl ModelRequest {
    pub fn new(model: ModelSpec) -> Self {
        Self {
            model,
            system: Vec::new(),
            messages: Vec::new(),
            tools: Vec::new(),
            tool_choice: ToolChoice::Auto,
            parallel_tool_calls: true,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, segment: impl Into<String>) -> Self {
        let segment = segment.into();
        if !segment.trim().is_empty() {
            self.system.push(segment);
        }
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }

    pub fn with_parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = enabled;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// System segments joined for APIs that take a single system string.
    pub fn system_prompt(&self) -> String {
        self.system.join("\n\n")
    }
}

/// Gateway for LLM communication
///
/// This port defines how the application layer communicates with LLM providers.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Invoke a model. Errors are returned only once no provider could answer.
    async fn invoke(&self, request: &ModelRequest) -> Result<LlmResponse, GatewayError>;
}
