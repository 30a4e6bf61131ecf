//! Forced-choice completion decisions
//!
//! A decision call offers the model exactly two actions and expects exactly
//! one call back. The result is modeled as the tagged union
//! [`CompletionDecision`]; anything else is a [`ContractViolation`].

pub mod entities;
pub mod tools;

pub use entities::{CompletionDecision, ContractViolation};
pub use tools::{
    COMPLETED_SUMMARY_ARG, MARK_TASK_COMPLETED, MARK_TASK_NOT_COMPLETED, REASONING_ARG,
    decision_tools, parse_decision, select_decision,
};
