//! Application layer for stepwise
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::ArbiterParams;
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    document_store::{DocumentError, DocumentId, DocumentStore},
    llm_gateway::{GatewayError, LlmGateway, ModelRequest, ToolChoice},
    progress::{NoProgress, ProgressNotifier},
};
pub use use_cases::checkpoint::{CheckpointError, CheckpointService, CheckpointSnapshot};
pub use use_cases::progress_plan_step::{
    CheckpointStatus, NextStage, ProgressPlanStepError, ProgressPlanStepInput,
    ProgressPlanStepOutput, ProgressPlanStepUseCase,
};
