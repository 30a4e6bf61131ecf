//! Google Generative Language (Gemini) `generateContent` provider.
//!
//! Gemini has no tool call ids. Calls in a response get synthetic ids, and
//! tool results are matched back to the function name through the
//! assistant turn that issued them.

use super::schema::input_schema;
use super::{ProviderAdapter, ProviderKind, http_error, resolve_api_key};
use crate::config::FileGoogleGenAiConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use stepwise_application::ports::llm_gateway::{GatewayError, ModelRequest, ToolChoice};
use stepwise_domain::{ContentBlock, LlmResponse, Message, Role, StopReason, UsageStats};
use tracing::debug;

pub struct GoogleGenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
}

impl GoogleGenAiProvider {
    /// Build from the `[providers.google_genai]` section.
    ///
    /// Fails with `NotConfigured` when no API key is available.
    pub fn new(config: &FileGoogleGenAiConfig) -> Result<Self, GatewayError> {
        let api_key = resolve_api_key(config.api_key.as_deref(), &config.api_key_env)
            .ok_or_else(|| {
                GatewayError::NotConfigured(format!(
                    "google-genai: API key not set (env {})",
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

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn build_request_body(&self, request: &ModelRequest) -> Value {
        let mut system: Vec<String> = request.system.clone();
        system.extend(
            request
                .messages
                .iter()
                .filter(|m| m.role == Role::System)
                .map(|m| m.content.clone()),
        );

        let mut body = json!({
            "contents": contents(&request.messages),
            "generationConfig": {
                "maxOutputTokens": request.max_tokens.unwrap_or(self.max_tokens),
            },
        });

        if !system.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": system.join("\n\n") }] });
        }

        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "parameters": input_schema(t),
                    })
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
            body["toolConfig"] = json!({ "functionCallingConfig": function_calling(&request.tool_choice) });
        }

        body
    }
}

fn function_calling(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!({ "mode": "AUTO" }),
        ToolChoice::Any => json!({ "mode": "ANY" }),
        ToolChoice::None => json!({ "mode": "NONE" }),
        ToolChoice::Tool(name) => json!({ "mode": "ANY", "allowedFunctionNames": [name] }),
    }
}

/// Transcript as Gemini turns. Adjacent turns with the same role are merged,
/// so parallel tool results land in one `user` turn.
fn contents(messages: &[Message]) -> Vec<Value> {
    let mut call_names: HashMap<&str, &str> = HashMap::new();
    let mut turns: Vec<(&'static str, Vec<Value>)> = Vec::new();

    for message in messages.iter().filter(|m| m.role != Role::System) {
        let (role, parts) = match message.role {
            Role::Assistant => {
                let mut parts = Vec::new();
                if !message.content.is_empty() {
                    parts.push(json!({ "text": message.content }));
                }
                for call in &message.tool_calls {
                    if let Some(id) = call.native_id.as_deref() {
                        call_names.insert(id, call.tool_name.as_str());
                    }
                    parts.push(json!({
                        "functionCall": { "name": call.tool_name, "args": call.arguments }
                    }));
                }
                ("model", parts)
            }
            Role::Tool => {
                let name = message
                    .tool_call_id
                    .as_deref()
                    .and_then(|id| call_names.get(id).copied())
                    .unwrap_or_default();
                let part = json!({
                    "functionResponse": {
                        "name": name,
                        "response": { "content": message.content },
                    }
                });
                ("user", vec![part])
            }
            Role::User | Role::System => ("user", vec![json!({ "text": message.content })]),
        };

        if parts.is_empty() {
            continue;
        }
        match turns.last_mut() {
            Some((last_role, last_parts)) if *last_role == role => last_parts.extend(parts),
            _ => turns.push((role, parts)),
        }
    }

    turns
        .into_iter()
        .map(|(role, parts)| json!({ "role": role, "parts": parts }))
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    cached_content_token_count: u64,
}

fn parse_response(response: GenerateContentResponse) -> LlmResponse {
    let mut content = Vec::new();
    let mut finish_reason = None;
    let mut saw_call = false;

    if let Some(candidate) = response.candidates.into_iter().next() {
        finish_reason = candidate.finish_reason;
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        for (i, part) in parts.into_iter().enumerate() {
            if let Some(call) = part.function_call {
                saw_call = true;
                content.push(ContentBlock::ToolUse {
                    id: call.id.unwrap_or_else(|| format!("call_{}", i)),
                    name: call.name,
                    input: call.args,
                });
            } else if let Some(text) = part.text.filter(|t| !t.is_empty()) {
                content.push(ContentBlock::Text { text });
            }
        }
    }

    // Gemini reports STOP for function calls too
    let stop_reason = finish_reason.map(|reason| match reason.as_str() {
        "STOP" if saw_call => StopReason::ToolUse,
        "STOP" => StopReason::EndTurn,
        "MAX_TOKENS" => StopReason::MaxTokens,
        _ => StopReason::Other(reason),
    });

    // Cached content is a subset of the prompt count
    let usage = response.usage_metadata.map(|u| UsageStats {
        input_tokens: u.prompt_token_count.saturating_sub(u.cached_content_token_count),
        output_tokens: u.candidates_token_count,
        cache_creation_input_tokens: 0,
        cache_read_input_tokens: u.cached_content_token_count,
    });

    LlmResponse {
        content,
        stop_reason,
        model: response.model_version,
        usage,
    }
}

#[async_trait]
impl ProviderAdapter for GoogleGenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GoogleGenAi
    }

    async fn invoke(
        &self,
        model: &str,
        request: &ModelRequest,
    ) -> Result<LlmResponse, GatewayError> {
        let body = self.build_request_body(request);
        debug!(model, messages = request.messages.len(), "Sending Gemini request");

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
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
            return Err(http_error(ProviderKind::GoogleGenAi, status, &text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| GatewayError::InvalidResponse(format!("google-genai: {}", e)))?;
        if parsed.candidates.is_empty() {
            return Err(GatewayError::InvalidResponse(
                "google-genai: no candidates in response".to_string(),
            ));
        }
        Ok(parse_response(parsed))
    }
}
