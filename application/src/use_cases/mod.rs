//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod checkpoint;
pub mod progress_plan_step;
