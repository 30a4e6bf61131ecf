//! OpenAI Chat Completions provider.

use super::schema::input_schema;
use super::{ProviderAdapter, ProviderKind, http_error, resolve_api_key};
use crate::config::FileOpenAiConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use stepwise_application::ports::llm_gateway::{GatewayError, ModelRequest, ToolChoice};
use stepwise_domain::{ContentBlock, LlmResponse, Message, Role, StopReason, UsageStats};
use tracing::{debug, warn};

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
}

impl OpenAiProvider {
    /// Build from the `[providers.openai]` section.
    ///
    /// Fails with `NotConfigured` when no API key is available.
    pub fn new(config: &FileOpenAiConfig) -> Result<Self, GatewayError> {
        let api_key = resolve_api_key(config.api_key.as_deref(), &config.api_key_env)
            .ok_or_else(|| {
                GatewayError::NotConfigured(format!(
                    "openai: API key not set (env {})",
                    config.api_key_env
                ))
            })?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request_body(&self, model: &str, request: &ModelRequest) -> Value {
        let mut messages: Vec<Value> = Vec::with_capacity(request.messages.len() + 1);
        let system = request.system_prompt();
        if !system.is_empty() {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.extend(request.messages.iter().map(message_to_openai));

        let mut body = json!({
            "model": model,
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
            "messages": messages,
        });

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": input_schema(t),
                        }
                    })
                })
                .collect();
            body["tools"] = json!(tools);
            body["tool_choice"] = match &request.tool_choice {
                ToolChoice::Auto => json!("auto"),
                ToolChoice::Any => json!("required"),
                ToolChoice::None => json!("none"),
                ToolChoice::Tool(name) => json!({ "type": "function", "function": { "name": name } }),
            };
            body["parallel_tool_calls"] = json!(request.parallel_tool_calls);
        }

        body
    }
}

fn message_to_openai(message: &Message) -> Value {
    match message.role {
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id.clone().unwrap_or_default(),
            "content": message.content,
        }),
        Role::Assistant if !message.tool_calls.is_empty() => {
            let tool_calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.native_id.clone().unwrap_or_default(),
                        "type": "function",
                        "function": {
                            "name": call.tool_name,
                            "arguments": serde_json::to_string(&call.arguments).unwrap_or_default(),
                        }
                    })
                })
                .collect();
            // Some compatible APIs require the content field even when empty
            let content = if message.content.is_empty() {
                Value::Null
            } else {
                json!(message.content)
            };
            json!({ "role": "assistant", "content": content, "tool_calls": tool_calls })
        }
        Role::Assistant => json!({ "role": "assistant", "content": message.content }),
        Role::System => json!({ "role": "system", "content": message.content }),
        Role::User => json!({ "role": "user", "content": message.content }),
    }
}

/// OpenAI API response format
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    model: Option<String>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: Option<OpenAiMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OpenAiToolCall>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Debug, Deserialize)]
struct PromptTokensDetails {
    #[serde(default)]
    cached_tokens: u64,
}

fn parse_response(response: OpenAiResponse) -> LlmResponse {
    let mut content = Vec::new();
    let mut finish_reason = None;

    if let Some(choice) = response.choices.into_iter().next() {
        finish_reason = choice.finish_reason;
        if let Some(message) = choice.message {
            if let Some(text) = message.content.filter(|t| !t.is_empty()) {
                content.push(ContentBlock::Text { text });
            }
            for call in message.tool_calls {
                let input = match serde_json::from_str::<HashMap<String, Value>>(&call.function.arguments) {
                    Ok(input) => input,
                    Err(e) => {
                        warn!(tool = %call.function.name, error = %e, "Unparseable tool call arguments");
                        HashMap::new()
                    }
                };
                content.push(ContentBlock::ToolUse {
                    id: call.id,
                    name: call.function.name,
                    input,
                });
            }
        }
    }

    let stop_reason = finish_reason.map(|reason| match reason.as_str() {
        "stop" => StopReason::EndTurn,
        "tool_calls" => StopReason::ToolUse,
        "length" => StopReason::MaxTokens,
        _ => StopReason::Other(reason),
    });

    // OpenAI reports cached tokens as a subset of prompt tokens
    let usage = response.usage.map(|u| {
        let cached = u.prompt_tokens_details.map_or(0, |d| d.cached_tokens);
        UsageStats {
            input_tokens: u.prompt_tokens.saturating_sub(cached),
            output_tokens: u.completion_tokens,
            cache_creation_input_tokens: 0,
            cache_read_input_tokens: cached,
        }
    });

    LlmResponse {
        content,
        stop_reason,
        model: response.model,
        usage,
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn invoke(
        &self,
        model: &str,
        request: &ModelRequest,
    ) -> Result<LlmResponse, GatewayError> {
        let body = self.build_request_body(model, request);
        debug!(model, messages = request.messages.len(), "Sending OpenAI request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::ConnectionError(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::ConnectionError(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(http_error(ProviderKind::OpenAi, status, &text));
        }

        let parsed: OpenAiResponse = serde_json::from_str(&text)
            .map_err(|e| GatewayError::InvalidResponse(format!("openai: {}", e)))?;
        if parsed.choices.is_empty() {
            return Err(GatewayError::InvalidResponse("openai: no choices in response".to_string()));
        }
        Ok(parse_response(parsed))
    }
}
