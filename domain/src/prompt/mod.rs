//! Prompt domain
//!
//! Templates for the completion-decision call and plan rendering.

pub mod plan;
mod template;

pub use plan::format_plan_prompt;
pub use template::CompletionPromptTemplate;
