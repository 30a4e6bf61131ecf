//! Per-model token usage ledger
//!
//! Usage accumulates for the lifetime of one agent run and is periodically
//! written into the checkpoint document. Two updates exist: [`Merge`] adds
//! live deltas, [`Replace`] installs a rehydrated checkpoint verbatim so that
//! already-recorded usage is never counted twice.
//!
//! [`Merge`]: TokenDataUpdate::Merge
//! [`Replace`]: TokenDataUpdate::Replace

use crate::session::response::UsageStats;
use serde::{Deserialize, Serialize};

/// Token counters for a single model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTokenData {
    /// Model identifier, usually `provider:model`
    pub model: String,
    pub cache_creation_input_tokens: u64,
    pub cache_read_input_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl ModelTokenData {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Convert the usage reported for one model response.
    pub fn from_usage(model: impl Into<String>, usage: &UsageStats) -> Self {
        Self {
            model: model.into(),
            cache_creation_input_tokens: usage.cache_creation_input_tokens,
            cache_read_input_tokens: usage.cache_read_input_tokens,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        }
    }

    /// Add another entry's counters field-wise (saturating).
    pub fn accumulate(&mut self, other: &ModelTokenData) {
        self.cache_creation_input_tokens = self
            .cache_creation_input_tokens
            .saturating_add(other.cache_creation_input_tokens);
        self.cache_read_input_tokens = self
            .cache_read_input_tokens
            .saturating_add(other.cache_read_input_tokens);
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }

    /// All input tokens, cached or not.
    pub fn total_input_tokens(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.cache_creation_input_tokens)
            .saturating_add(self.cache_read_input_tokens)
    }

    /// Share of input tokens served from the prompt cache (0.0 - 1.0).
    pub fn cache_hit_ratio(&self) -> f64 {
        let total = self.total_input_tokens();
        if total == 0 {
            return 0.0;
        }
        self.cache_read_input_tokens as f64 / total as f64
    }
}

/// An update applied to the usage ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenDataUpdate {
    /// Add counters per model (live execution)
    Merge(Vec<ModelTokenData>),
    /// Install the given list verbatim (rehydration from a checkpoint)
    Replace(Vec<ModelTokenData>),
}

impl TokenDataUpdate {
    pub fn apply(self, existing: Vec<ModelTokenData>) -> Vec<ModelTokenData> {
        match self {
            TokenDataUpdate::Merge(incoming) => merge_token_data(existing, &incoming),
            TokenDataUpdate::Replace(incoming) => replace_token_data(existing, incoming),
        }
    }
}

/// Add `incoming` into `existing`, field-wise per model.
///
/// Entries for models not yet present are appended in first-seen order;
/// models present only in `existing` are left untouched. Several incoming
/// entries for the same model all accumulate.
pub fn merge_token_data(
    mut existing: Vec<ModelTokenData>,
    incoming: &[ModelTokenData],
) -> Vec<ModelTokenData> {
    for update in incoming {
        match existing.iter_mut().find(|e| e.model == update.model) {
            Some(entry) => entry.accumulate(update),
            None => existing.push(update.clone()),
        }
    }
    existing
}

/// Discard `existing` and return `incoming` as-is.
pub fn replace_token_data(
    _existing: Vec<ModelTokenData>,
    incoming: Vec<ModelTokenData>,
) -> Vec<ModelTokenData> {
    incoming
}

/// Sum of all models' counters, reported under `model`.
pub fn total_token_data(entries: &[ModelTokenData], model: &str) -> ModelTokenData {
    entries.iter().fold(ModelTokenData::new(model), |mut acc, e| {
        acc.accumulate(e);
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn entry(model: &str, cc: u64, cr: u64, input: u64, output: u64) -> ModelTokenData {
        ModelTokenData {
            model: model.to_string(),
            cache_creation_input_tokens: cc,
            cache_read_input_tokens: cr,
            input_tokens: input,
            output_tokens: output,
        }
    }

    fn by_model(entries: &[ModelTokenData]) -> BTreeMap<String, ModelTokenData> {
        entries.iter().map(|e| (e.model.clone(), e.clone())).collect()
    }

    const SONNET: &str = "anthropic:claude-sonnet-4-0";
    const MINI: &str = "openai:gpt-4.1-mini";
    const TURBO: &str = "openai:gpt-3.5-turbo";

    #[test]
    fn test_merge_same_model_and_new_model() {
        let state = vec![entry(SONNET, 100, 50, 200, 150), entry(MINI, 80, 30, 120, 90)];
        let update = vec![entry(SONNET, 25, 15, 75, 60), entry(TURBO, 40, 20, 100, 80)];

        let result = merge_token_data(state, &update);

        assert_eq!(result.len(), 3);
        assert_eq!(result[0], entry(SONNET, 125, 65, 275, 210));
        assert_eq!(result[1], entry(MINI, 80, 30, 120, 90));
        assert_eq!(result[2], entry(TURBO, 40, 20, 100, 80));
    }

    #[test]
    fn test_merge_multiple_updates_for_same_model() {
        let state = vec![entry(SONNET, 100, 50, 200, 150)];
        let update = vec![entry(SONNET, 25, 15, 75, 60), entry(SONNET, 10, 5, 30, 20)];

        let result = merge_token_data(state, &update);

        assert_eq!(result, vec![entry(SONNET, 135, 70, 305, 230)]);
    }

    #[test]
    fn test_merge_into_empty_and_with_empty() {
        let update = vec![entry(SONNET, 100, 50, 200, 150)];
        assert_eq!(merge_token_data(Vec::new(), &update), update);
        assert_eq!(merge_token_data(update.clone(), &[]), update);
    }

    #[test]
    fn test_merge_is_associative() {
        let a = vec![entry(SONNET, 1, 2, 3, 4), entry(MINI, 5, 6, 7, 8)];
        let b = vec![entry(MINI, 10, 10, 10, 10), entry(TURBO, 1, 1, 1, 1)];
        let c = vec![entry(SONNET, 100, 0, 0, 1), entry(TURBO, 2, 2, 2, 2)];

        let left = merge_token_data(merge_token_data(a.clone(), &b), &c);
        let right = merge_token_data(a, &merge_token_data(b, &c));

        assert_eq!(by_model(&left), by_model(&right));
    }

    #[test]
    fn test_merge_ignores_incoming_order() {
        let state = vec![entry(SONNET, 1, 1, 1, 1)];
        let forward = vec![entry(MINI, 3, 0, 9, 1), entry(SONNET, 2, 2, 2, 2), entry(MINI, 1, 1, 1, 1)];
        let mut backward = forward.clone();
        backward.reverse();

        assert_eq!(
            by_model(&merge_token_data(state.clone(), &forward)),
            by_model(&merge_token_data(state, &backward))
        );
    }

    #[test]
    fn test_merge_saturates() {
        let state = vec![entry(SONNET, u64::MAX, 0, 0, 0)];
        let result = merge_token_data(state, &[entry(SONNET, 1, 0, 0, 0)]);
        assert_eq!(result[0].cache_creation_input_tokens, u64::MAX);
    }

    #[test]
    fn test_replace_returns_incoming() {
        let state = vec![entry(SONNET, 100, 50, 200, 150), entry(MINI, 80, 30, 120, 90)];
        let incoming = vec![entry(TURBO, 40, 20, 100, 80)];

        assert_eq!(
            TokenDataUpdate::Replace(incoming.clone()).apply(state),
            incoming
        );
        assert_eq!(
            TokenDataUpdate::Replace(incoming.clone()).apply(Vec::new()),
            incoming
        );
    }

    #[test]
    fn test_update_merge_dispatch() {
        let state = vec![entry(SONNET, 1, 1, 1, 1)];
        let result = TokenDataUpdate::Merge(vec![entry(SONNET, 1, 1, 1, 1)]).apply(state);
        assert_eq!(result, vec![entry(SONNET, 2, 2, 2, 2)]);
    }

    #[test]
    fn test_from_usage_and_ratio() {
        let usage = UsageStats {
            input_tokens: 20,
            output_tokens: 5,
            cache_creation_input_tokens: 30,
            cache_read_input_tokens: 50,
        };
        let data = ModelTokenData::from_usage(SONNET, &usage);
        assert_eq!(data.total_input_tokens(), 100);
        assert!((data.cache_hit_ratio() - 0.5).abs() < f64::EPSILON);
        assert_eq!(ModelTokenData::new(SONNET).cache_hit_ratio(), 0.0);
    }

    #[test]
    fn test_total_token_data() {
        let entries = vec![entry(SONNET, 1, 2, 3, 4), entry(MINI, 10, 20, 30, 40)];
        assert_eq!(total_token_data(&entries, "total"), entry("total", 11, 22, 33, 44));
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(entry(SONNET, 1, 2, 3, 4)).unwrap();
        assert_eq!(json["cacheCreationInputTokens"], 1);
        assert_eq!(json["cacheReadInputTokens"], 2);
        assert_eq!(json["inputTokens"], 3);
        assert_eq!(json["outputTokens"], 4);
    }
}
