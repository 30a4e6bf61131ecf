//! Embed and extract checkpoint payloads in a shared text document
//!
//! The document is treated as an opaque string that humans may also edit.
//! Only the bytes between a payload's sentinel tags (or the insertion point
//! inside the collapsible wrapper) are ever touched.
//!
//! Extraction never fails: a missing pair yields `None`, and a payload that
//! does not decode into the expected shape is logged and also yields `None`,
//! so a corrupted checkpoint degrades to "no checkpoint".

use super::tags::{
    AGENT_CONTEXT_SUMMARY, DETAILS_CLOSE_TAG, DETAILS_OPEN_TAG, PayloadKind, SUMMARY_CLOSE_TAG,
    SUMMARY_OPEN_TAG,
};
use crate::plan::TaskPlan;
use crate::usage::ModelTokenData;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::error;

/// A value that is stored under its own pair of sentinel tags.
pub trait CheckpointPayload: Serialize + DeserializeOwned {
    const KIND: PayloadKind;
}

impl CheckpointPayload for TaskPlan {
    const KIND: PayloadKind = PayloadKind::TaskPlan;
}

impl CheckpointPayload for Vec<ModelTokenData> {
    const KIND: PayloadKind = PayloadKind::TokenData;
}

/// Plan steps proposed by the planner, awaiting acceptance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposedPlan(pub Vec<String>);

impl ProposedPlan {
    pub fn steps(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl CheckpointPayload for ProposedPlan {
    const KIND: PayloadKind = PayloadKind::ProposedPlan;
}

/// Byte offsets of one open/close pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TagSpan {
    open_start: usize,
    content_start: usize,
    content_end: usize,
    close_end: usize,
}

impl TagSpan {
    fn range(&self) -> Range<usize> {
        self.open_start..self.close_end
    }
}

fn is_protected(protected: &[Range<usize>], pos: usize) -> bool {
    protected.iter().any(|r| r.contains(&pos))
}

/// Find the first pair at or after `from`: the first close tag, matched with
/// the nearest open tag before it. Unpaired tags are skipped, as are tags
/// starting inside a `protected` range.
fn locate(
    document: &str,
    open: &str,
    close: &str,
    from: usize,
    protected: &[Range<usize>],
) -> Option<TagSpan> {
    let mut search_from = from;
    loop {
        let close_start = document[search_from..]
            .match_indices(close)
            .map(|(i, _)| search_from + i)
            .find(|&i| !is_protected(protected, i))?;

        let open_start = document[search_from..close_start]
            .rmatch_indices(open)
            .map(|(i, _)| search_from + i)
            .find(|&i| !is_protected(protected, i));

        if let Some(open_start) = open_start {
            return Some(TagSpan {
                open_start,
                content_start: open_start + open.len(),
                content_end: close_start,
                close_end: close_start + close.len(),
            });
        }
        search_from = close_start + close.len();
    }
}

fn locate_all(
    document: &str,
    open: &str,
    close: &str,
    protected: &[Range<usize>],
) -> Vec<TagSpan> {
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(span) = locate(document, open, close, from, protected) {
        from = span.close_end;
        spans.push(span);
    }
    spans
}

/// Regions occupied by payload blocks of any kind.
fn payload_regions(document: &str) -> Vec<Range<usize>> {
    PayloadKind::ALL
        .iter()
        .flat_map(|kind| locate_all(document, kind.open_tag(), kind.close_tag(), &[]))
        .map(|span| span.range())
        .collect()
}

/// A well-formed collapsible wrapper.
#[derive(Debug, Clone, Copy)]
struct Wrapper {
    /// Where new payload blocks go: after the summary line, or right after
    /// the opening tag when the wrapper has no summary
    insert_at: usize,
    close_start: usize,
    agent_context: bool,
}

fn find_wrapper(document: &str) -> Option<Wrapper> {
    let protected = payload_regions(document);
    let wrappers: Vec<Wrapper> = locate_all(document, DETAILS_OPEN_TAG, DETAILS_CLOSE_TAG, &protected)
        .into_iter()
        .map(|span| {
            let inner = &document[span.content_start..span.content_end];
            let leading = inner.len() - inner.trim_start().len();
            let summary = inner
                .trim_start()
                .starts_with(SUMMARY_OPEN_TAG)
                .then(|| inner.find(SUMMARY_CLOSE_TAG))
                .flatten()
                .map(|end| end + SUMMARY_CLOSE_TAG.len());

            match summary {
                Some(summary_end) => Wrapper {
                    insert_at: span.content_start + summary_end,
                    close_start: span.content_end,
                    agent_context: &inner[leading..summary_end] == AGENT_CONTEXT_SUMMARY,
                },
                None => Wrapper {
                    insert_at: span.content_start,
                    close_start: span.content_end,
                    agent_context: false,
                },
            }
        })
        .collect();

    wrappers
        .iter()
        .find(|w| w.agent_context)
        .or_else(|| wrappers.first())
        .copied()
}

/// The trimmed text between the first tag pair of `kind`, if present.
pub fn extract_raw(document: &str, kind: PayloadKind) -> Option<&str> {
    let span = locate(document, kind.open_tag(), kind.close_tag(), 0, &[])?;
    Some(document[span.content_start..span.content_end].trim())
}

/// Decode the payload of type `P` from `document`.
pub fn extract<P: CheckpointPayload>(document: &str) -> Option<P> {
    let raw = extract_raw(document, P::KIND)?;
    match serde_json::from_str::<P>(raw) {
        Ok(payload) => Some(payload),
        Err(e) => {
            error!(
                kind = %P::KIND,
                raw = raw,
                error = %e,
                "Failed to parse checkpoint payload; treating as absent"
            );
            None
        }
    }
}

pub fn extract_task_plan(document: &str) -> Option<TaskPlan> {
    extract(document)
}

pub fn extract_proposed_plan(document: &str) -> Option<ProposedPlan> {
    extract(document)
}

pub fn extract_token_data(document: &str) -> Option<Vec<ModelTokenData>> {
    extract(document)
}

/// Pretty-printed JSON with `</` escaped, so payload text can never contain a
/// closing tag.
pub fn encode_payload<P: Serialize>(payload: &P) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string_pretty(payload)?.replace("</", "<\\/"))
}

/// Place `payload` between the tags of `kind`.
///
/// 1. No pair of `kind` and no wrapper: a new wrapper holding the block is
///    appended to the document.
/// 2. No pair of `kind` but a wrapper exists: the block becomes the first
///    element of the wrapper (the Agent Context wrapper if there is one).
/// 3. A pair of `kind` exists: only the bytes between the tags change.
pub fn insert(document: &str, kind: PayloadKind, payload: &str) -> String {
    let block = format!("{}\n{}\n{}", kind.open_tag(), payload, kind.close_tag());

    if let Some(span) = locate(document, kind.open_tag(), kind.close_tag(), 0, &[]) {
        return format!(
            "{}{}{}",
            &document[..span.open_start],
            block,
            &document[span.close_end..]
        );
    }

    match find_wrapper(document) {
        Some(wrapper) => {
            let rest = &document[wrapper.insert_at..wrapper.close_start];
            let separator = if rest.starts_with('\n') { "" } else { "\n" };
            format!(
                "{}\n{}{}{}{}",
                &document[..wrapper.insert_at],
                block,
                separator,
                rest,
                &document[wrapper.close_start..]
            )
        }
        None => format!(
            "{document}\n{DETAILS_OPEN_TAG}\n{AGENT_CONTEXT_SUMMARY}\n{block}\n{DETAILS_CLOSE_TAG}"
        ),
    }
}

/// Encode `payload` and insert it under its own kind.
pub fn insert_payload<P: CheckpointPayload>(
    document: &str,
    payload: &P,
) -> Result<String, serde_json::Error> {
    Ok(insert(document, P::KIND, &encode_payload(payload)?))
}
