//! Provider-neutral model responses
//!
//! Adapters map their wire format onto [`LlmResponse`]. The decision cycle
//! only cares about two things in it: which tool uses the model emitted,
//! and how many tokens the call cost.

use crate::tool::entities::ToolCall;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One block of model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    /// `id` correlates the tool result sent back on the next turn.
    ToolUse {
        id: String,
        name: String,
        input: HashMap<String, serde_json::Value>,
    },
}

/// Why generation ended. Anything a provider reports outside the known
/// set is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Other(String),
}

/// Per-call token counts. Cache counters stay zero for providers that do
/// not report them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_input_tokens: u64,
    pub cache_read_input_tokens: u64,
}

/// A model reply, normalized across providers.
///
/// ```
/// use stepwise_domain::session::response::{ContentBlock, LlmResponse, StopReason};
///
/// let response = LlmResponse {
///     content: vec![ContentBlock::ToolUse {
///         id: "toolu_1".to_string(),
///         name: "mark_task_completed".to_string(),
///         input: [(
///             "completed_task_summary".to_string(),
///             serde_json::json!("Fixed the race"),
///         )]
///         .into_iter()
///         .collect(),
///     }],
///     stop_reason: Some(StopReason::ToolUse),
///     model: Some("anthropic:claude-sonnet-4-0".to_string()),
///     usage: None,
/// };
/// assert_eq!(response.tool_calls()[0].tool_name, "mark_task_completed");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<StopReason>,
    /// `provider:model` that answered, once the gateway has routed the call
    pub model: Option<String>,
    pub usage: Option<UsageStats>,
}

impl LlmResponse {
    /// A plain text reply that ended its turn.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            stop_reason: Some(StopReason::EndTurn),
            model: None,
            usage: None,
        }
    }

    /// All text blocks, joined without separators.
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        for block in &self.content {
            if let ContentBlock::Text { text: part } = block {
                text.push_str(part);
            }
        }
        text
    }

    /// Tool uses in emission order.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        let mut calls = Vec::new();
        for block in &self.content {
            if let ContentBlock::ToolUse { id, name, input } = block {
                calls.push(ToolCall::from_native(id, name, input.clone()));
            }
        }
        calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_use(id: &str, name: &str, key: &str, value: &str) -> ContentBlock {
        ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input: HashMap::from([(key.to_string(), json!(value))]),
        }
    }

    #[test]
    fn prose_only_reply_has_no_tool_calls() {
        let response = LlmResponse::from_text("I believe the fix is in.");
        assert!(response.tool_calls().is_empty());
        assert_eq!(response.text_content(), "I believe the fix is in.");
    }

    #[test]
    fn interleaved_blocks_split_into_text_and_calls() {
        let response = LlmResponse {
            content: vec![
                ContentBlock::Text { text: "Looking at the log. ".to_string() },
                tool_use("toolu_a", "mark_task_not_completed", "reasoning", "CI red"),
                ContentBlock::Text { text: "Also:".to_string() },
                tool_use("toolu_b", "mark_task_completed", "completed_task_summary", "done"),
            ],
            stop_reason: Some(StopReason::ToolUse),
            model: None,
            usage: None,
        };

        assert_eq!(response.text_content(), "Looking at the log. Also:");
        let calls = response.tool_calls();
        let ids: Vec<_> = calls.iter().filter_map(|c| c.native_id.as_deref()).collect();
        assert_eq!(ids, vec!["toolu_a", "toolu_b"]);
        assert_eq!(calls[0].get_string("reasoning"), Some("CI red"));
    }

    #[test]
    fn content_block_wire_shape() {
        let block = tool_use("toolu_a", "mark_task_completed", "completed_task_summary", "ok");
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "tool_use");
        assert_eq!(value["input"]["completed_task_summary"], "ok");

        let unknown: StopReason = serde_json::from_value(json!({ "other": "refusal" })).unwrap();
        assert_eq!(unknown, StopReason::Other("refusal".to_string()));
    }
}
