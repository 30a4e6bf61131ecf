//! Domain layer for stepwise
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Task plan
//!
//! A [`TaskPlan`] is an ordered list of tasks. Each task keeps an
//! append-only history of plan revisions, and the items of the active
//! revision are completed one at a time, lowest index first. All plan
//! operations are pure: they take a plan by value and return the new plan.
//!
//! ## Checkpoints
//!
//! Plan state, proposed plans and token usage are mirrored into an external
//! document between sentinel tags ([`checkpoint`]). Extraction degrades to
//! "no checkpoint" on corruption; insertion only touches its own region.
//!
//! ## Completion decisions
//!
//! The decision model is forced to pick exactly one of two actions
//! ([`decision`]), parsed into a [`CompletionDecision`].

pub mod checkpoint;
pub mod config;
pub mod core;
pub mod decision;
pub mod plan;
pub mod prompt;
pub mod session;
pub mod tool;
pub mod usage;
pub mod util;

// Re-export commonly used types
pub use checkpoint::{CheckpointPayload, PayloadKind, ProposedPlan};
pub use config::{ConfigIssue, ConfigIssueCode, Severity};
pub use core::{error::DomainError, model::ModelSpec};
pub use decision::{CompletionDecision, ContractViolation};
pub use plan::{PlanItem, PlanRevision, RevisionAuthor, Task, TaskPlan};
pub use prompt::{CompletionPromptTemplate, format_plan_prompt};
pub use session::{
    entities::{Message, Role},
    response::{ContentBlock, LlmResponse, StopReason, UsageStats},
};
pub use tool::{ToolCall, ToolDefinition, ToolParameter};
pub use usage::{ModelTokenData, TokenDataUpdate};
