//! Core domain concepts shared across all subdomains.
//!
//! - [`model::ModelSpec`] — a model addressed through a provider (`provider:model`)
//! - [`error::DomainError`] — domain-level errors

pub mod error;
pub mod model;
