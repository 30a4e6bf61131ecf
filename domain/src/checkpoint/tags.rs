//! Sentinel tags delimiting checkpoint payloads inside a document
//!
//! The strings are bit-exact with documents written by earlier agent runs and
//! must not change.

use serde::{Deserialize, Serialize};

/// Opening tag of the collapsible wrapper.
pub const DETAILS_OPEN_TAG: &str = "<details>";
/// Closing tag of the collapsible wrapper.
pub const DETAILS_CLOSE_TAG: &str = "</details>";
/// Summary line written as the first line inside an agent-owned wrapper.
pub const AGENT_CONTEXT_SUMMARY: &str = "<summary>Agent Context</summary>";

pub(crate) const SUMMARY_OPEN_TAG: &str = "<summary>";
pub(crate) const SUMMARY_CLOSE_TAG: &str = "</summary>";

/// The kinds of payload a checkpoint document can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PayloadKind {
    TaskPlan,
    ProposedPlan,
    TokenData,
}

impl PayloadKind {
    pub const ALL: [PayloadKind; 3] = [
        PayloadKind::TaskPlan,
        PayloadKind::ProposedPlan,
        PayloadKind::TokenData,
    ];

    pub fn open_tag(&self) -> &'static str {
        match self {
            PayloadKind::TaskPlan => "<open-swe-do-not-edit-task-plan>",
            PayloadKind::ProposedPlan => "<open-swe-do-not-edit-proposed-plan>",
            PayloadKind::TokenData => "<open-swe-do-not-edit-token-data>",
        }
    }

    pub fn close_tag(&self) -> &'static str {
        match self {
            PayloadKind::TaskPlan => "</open-swe-do-not-edit-task-plan>",
            PayloadKind::ProposedPlan => "</open-swe-do-not-edit-proposed-plan>",
            PayloadKind::TokenData => "</open-swe-do-not-edit-token-data>",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::TaskPlan => "taskPlan",
            PayloadKind::ProposedPlan => "proposedPlan",
            PayloadKind::TokenData => "tokenData",
        }
    }
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_unique() {
        let mut tags: Vec<&str> = PayloadKind::ALL
            .iter()
            .flat_map(|k| [k.open_tag(), k.close_tag()])
            .collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), 6);
    }

    #[test]
    fn test_close_tag_matches_open_tag() {
        for kind in PayloadKind::ALL {
            assert_eq!(kind.close_tag(), kind.open_tag().replacen('<', "</", 1));
        }
    }
}
