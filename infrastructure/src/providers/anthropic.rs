//! Anthropic Messages API provider.

use super::schema::input_schema;
use super::{ProviderAdapter, ProviderKind, http_error, resolve_api_key};
use crate::config::FileAnthropicConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use stepwise_application::ports::llm_gateway::{GatewayError, ModelRequest, ToolChoice};
use stepwise_domain::{ContentBlock, LlmResponse, Message, Role, StopReason, UsageStats};
use tracing::debug;

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    api_version: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Build from the `[providers.anthropic]` section.
    ///
    /// Fails with `NotConfigured` when no API key is available.
    pub fn new(config: &FileAnthropicConfig) -> Result<Self, GatewayError> {
        let api_key = resolve_api_key(config.api_key.as_deref(), &config.api_key_env)
            .ok_or_else(|| {
                GatewayError::NotConfigured(format!(
                    "anthropic: API key not set (env {})",
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
            api_version: config.api_version.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn build_request_body(&self, model: &str, request: &ModelRequest) -> Value {
        let mut system: Vec<String> = request.system.clone();
        system.extend(
            request
                .messages
                .iter()
                .filter(|m| m.role == Role::System)
                .map(|m| m.content.clone()),
        );

        let messages: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(message_to_claude)
            .collect();

        let mut body = json!({
            "model": model,
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
            "messages": messages,
        });

        if !system.is_empty() {
            body["system"] = json!(system.join("\n\n"));
        }

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": input_schema(t),
                    })
                })
                .collect();
            body["tools"] = json!(tools);
            body["tool_choice"] = tool_choice(&request.tool_choice, request.parallel_tool_calls);
        }

        body
    }
}

fn tool_choice(choice: &ToolChoice, parallel: bool) -> Value {
    let mut value = match choice {
        ToolChoice::Auto => json!({ "type": "auto" }),
        ToolChoice::Any => json!({ "type": "any" }),
        ToolChoice::Tool(name) => json!({ "type": "tool", "name": name }),
        ToolChoice::None => return json!({ "type": "none" }),
    };
    if !parallel {
        value["disable_parallel_tool_use"] = json!(true);
    }
    value
}

fn message_to_claude(message: &Message) -> Value {
    match message.role {
        Role::Tool => json!({
            "role": "user",
            "content": [{
                "type": "tool_result",
                "tool_use_id": message.tool_call_id.clone().unwrap_or_default(),
                "content": message.content,
            }],
        }),
        Role::Assistant if !message.tool_calls.is_empty() => {
            let mut blocks = Vec::new();
            if !message.content.is_empty() {
                blocks.push(json!({ "type": "text", "text": message.content }));
            }
            for call in &message.tool_calls {
                blocks.push(json!({
                    "type": "tool_use",
                    "id": call.native_id.clone().unwrap_or_default(),
                    "name": call.tool_name,
                    "input": call.arguments,
                }));
            }
            json!({ "role": "assistant", "content": blocks })
        }
        Role::Assistant => json!({ "role": "assistant", "content": message.content }),
        Role::User | Role::System => json!({ "role": "user", "content": message.content }),
    }
}

/// Claude API response format
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeBlock>,
    model: Option<String>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: ClaudeUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct ClaudeUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    #[serde(default)]
    cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    cache_read_input_tokens: Option<u64>,
}

fn parse_response(response: ClaudeResponse) -> LlmResponse {
    let content = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ClaudeBlock::Text { text } => Some(ContentBlock::Text { text }),
            ClaudeBlock::ToolUse { id, name, input } => Some(ContentBlock::ToolUse {
                id,
                name,
                input: serde_json::from_value::<HashMap<String, Value>>(input).unwrap_or_default(),
            }),
            ClaudeBlock::Other => None,
        })
        .collect();

    let stop_reason = response.stop_reason.map(|reason| match reason.as_str() {
        "end_turn" => StopReason::EndTurn,
        "tool_use" => StopReason::ToolUse,
        "max_tokens" => StopReason::MaxTokens,
        _ => StopReason::Other(reason),
    });

    LlmResponse {
        content,
        stop_reason,
        model: response.model,
        usage: Some(UsageStats {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
            cache_creation_input_tokens: response.usage.cache_creation_input_tokens.unwrap_or(0),
            cache_read_input_tokens: response.usage.cache_read_input_tokens.unwrap_or(0),
        }),
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn invoke(
        &self,
        model: &str,
        request: &ModelRequest,
    ) -> Result<LlmResponse, GatewayError> {
        let body = self.build_request_body(model, request);
        debug!(model, messages = request.messages.len(), "Sending Anthropic request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
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
            return Err(http_error(ProviderKind::Anthropic, status, &text));
        }

        let parsed: ClaudeResponse = serde_json::from_str(&text)
            .map_err(|e| GatewayError::InvalidResponse(format!("anthropic: {}", e)))?;
        Ok(parse_response(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_domain::decision::decision_tools;
    use stepwise_domain::{ModelSpec, ToolCall};

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new(&FileAnthropicConfig {
            api_key: Some("sk-ant-test".to_string()),
            ..FileAnthropicConfig::default()
        })
        .unwrap()
    }

    fn decision_request() -> ModelRequest {
        ModelRequest::new(ModelSpec::new("anthropic", "claude-sonnet-4-0"))
            .with_system("You judge progress.")
            .with_messages(vec![
                Message::user("Fix the flaky test"),
                Message::assistant_with_tool_calls(
                    "",
                    vec![ToolCall::from_native("toolu_1", "run_command", HashMap::new())],
                ),
                Message::tool_result("toolu_1", "ok"),
            ])
            .with_tools(decision_tools())
            .with_tool_choice(ToolChoice::Any)
            .with_parallel_tool_calls(false)
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let result = AnthropicProvider::new(&FileAnthropicConfig {
            api_key: None,
            api_key_env: "STEPWISE_TEST_UNSET_ANTHROPIC_KEY".to_string(),
            ..FileAnthropicConfig::default()
        });
        assert!(matches!(result, Err(GatewayError::NotConfigured(_))));
    }

    #[test]
    fn test_request_body_forces_single_tool() {
        let body = provider().build_request_body("claude-sonnet-4-0", &decision_request());

        assert_eq!(body["model"], "claude-sonnet-4-0");
        assert_eq!(body["system"], "You judge progress.");
        assert_eq!(body["tool_choice"]["type"], "any");
        assert_eq!(body["tool_choice"]["disable_parallel_tool_use"], true);
        assert_eq!(body["tools"].as_array().unwrap().len(), 2);
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn test_tool_messages_use_content_blocks() {
        let body = provider().build_request_body("claude-sonnet-4-0", &decision_request());
        let messages = body["messages"].as_array().unwrap();

        assert_eq!(messages[1]["content"][0]["type"], "tool_use");
        assert_eq!(messages[1]["content"][0]["id"], "toolu_1");
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(messages[2]["content"][0]["type"], "tool_result");
        assert_eq!(messages[2]["content"][0]["tool_use_id"], "toolu_1");
    }

    #[test]
    fn test_parse_response_with_tool_use_and_cache_usage() {
        let raw = r#"{
            "id": "msg_1",
            "model": "claude-sonnet-4-0",
            "stop_reason": "tool_use",
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "tool_use", "id": "toolu_9", "name": "mark_task_completed",
                 "input": {"completed_task_summary": "Tests pass"}}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 5,
                      "cache_creation_input_tokens": 100, "cache_read_input_tokens": 50}
        }"#;
        let response = parse_response(serde_json::from_str(raw).unwrap());

        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
        let calls = response.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].get_string("completed_task_summary"), Some("Tests pass"));
        let usage = response.usage.unwrap();
        assert_eq!(usage.cache_creation_input_tokens, 100);
        assert_eq!(usage.cache_read_input_tokens, 50);
    }
}
