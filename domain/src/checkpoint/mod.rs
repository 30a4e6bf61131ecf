//! Checkpoint codec
//!
//! Plan state, proposed plans and token usage are mirrored into an external,
//! human-editable document (e.g. an issue body) between sentinel tags, inside
//! a collapsible `<details>` wrapper. See [`codec`] for the splice rules.

pub mod codec;
pub mod tags;

pub use codec::{
    CheckpointPayload, ProposedPlan, encode_payload, extract, extract_proposed_plan, extract_raw,
    extract_task_plan, extract_token_data, insert, insert_payload,
};
pub use tags::{AGENT_CONTEXT_SUMMARY, DETAILS_CLOSE_TAG, DETAILS_OPEN_TAG, PayloadKind};
