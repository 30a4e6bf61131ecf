//! Infrastructure layer for stepwise
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: model providers behind a fallback gateway,
//! checkpoint document stores, configuration file loading, and the
//! decision transcript.

pub mod config;
pub mod documents;
pub mod logging;
pub mod providers;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigSource, FileConfig};
pub use documents::{DocumentRouter, FileDocumentStore, GitHubIssueStore, InMemoryDocumentStore};
pub use logging::JsonlConversationLogger;
pub use providers::{
    AnthropicProvider, BreakerConfig, FallbackGateway, GoogleGenAiProvider, OpenAiProvider,
    ProviderAdapter, ProviderHealthRegistry, ProviderKind,
};
