//! Tool domain module
//!
//! A [`ToolDefinition`] describes an action offered to the model; the model
//! answers with [`ToolCall`]s carrying structured arguments. Provider
//! adapters turn definitions into each API's JSON schema format.

pub mod entities;

pub use entities::{ToolCall, ToolDefinition, ToolParameter};
