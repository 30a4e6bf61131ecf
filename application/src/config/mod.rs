//! Application-level configuration.
//!
//! - [`ArbiterParams`] — completion decision control (token budget, choice policy)

pub mod arbiter_params;

pub use arbiter_params::ArbiterParams;
