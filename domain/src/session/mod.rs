//! Conversation domain.
//!
//! - [`entities::Message`] — a single message of the agent conversation
//! - [`response::LlmResponse`] — a structured model response with usage
//! - [`tokens`] — token estimates used for history budgeting

pub mod entities;
pub mod response;
pub mod tokens;
