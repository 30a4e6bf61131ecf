//! Conversation token estimates
//!
//! A rough character-based estimate (four characters per token, rounded up)
//! is enough to decide when history should be summarized.

use super::entities::Message;

const CHARS_PER_TOKEN: usize = 4;

/// Estimated token count of a piece of text.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Estimated token count of one message, tool call arguments included.
pub fn message_tokens(message: &Message) -> usize {
    let call_tokens: usize = message
        .tool_calls
        .iter()
        .map(|call| {
            let args = serde_json::to_string(&call.arguments).unwrap_or_default();
            estimate_tokens(&call.tool_name) + estimate_tokens(&args)
        })
        .sum();
    estimate_tokens(&message.content) + call_tokens
}

/// Messages after the most recent summary message, minus the newest
/// `retain_recent` messages (which are never summarized).
pub fn messages_since_last_summary(messages: &[Message], retain_recent: usize) -> &[Message] {
    let start = messages
        .iter()
        .rposition(|m| m.summary)
        .map_or(0, |i| i + 1);
    let window = &messages[start..];
    &window[..window.len().saturating_sub(retain_recent)]
}

/// Token count of the history that a summarization step would compact.
///
/// Hidden messages do not count.
pub fn conversation_token_count(messages: &[Message], retain_recent: usize) -> usize {
    messages_since_last_summary(messages, retain_recent)
        .iter()
        .filter(|m| !m.hidden)
        .map(message_tokens)
        .sum()
}
