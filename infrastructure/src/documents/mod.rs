//! Document store adapters.
//!
//! Checkpoint documents live in local files, GitHub issue bodies, or
//! memory (tests). [`DocumentRouter`] dispatches on the [`DocumentId`]
//! variant so callers hold a single store.
//!
//! [`DocumentId`]: stepwise_application::ports::document_store::DocumentId

mod file_store;
mod github;
mod memory;
mod router;

pub use file_store::FileDocumentStore;
pub use github::GitHubIssueStore;
pub use memory::InMemoryDocumentStore;
pub use router::DocumentRouter;
