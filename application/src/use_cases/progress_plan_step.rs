//! Progress Plan Step use case
//!
//! One completion-decision cycle: ask the decision model whether the current
//! plan item is done (forcing exactly one of two actions), apply the answer
//! to the plan, persist it, and route to the next pipeline stage.
//!
//! ```text
//! not_completed ─┬─ history >= budget ─▶ SummarizeHistory
//!                └─ otherwise ─────────▶ GenerateAction
//! completed ─ complete item ─ persist ─┬─ no item left ─▶ RouteToReviewOrConclusion
//!                                      └─ item left ────▶ (same budget test)
//! ```

use crate::config::ArbiterParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger, events,
};
use crate::ports::document_store::DocumentId;
use crate::ports::llm_gateway::{GatewayError, LlmGateway, ModelRequest, ToolChoice};
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::use_cases::checkpoint::CheckpointService;
use serde_json::json;
use std::sync::Arc;
use stepwise_domain::decision::{self, CompletionDecision, ContractViolation};
use stepwise_domain::plan::{self, PlanItem, TaskPlan};
use stepwise_domain::session::tokens::conversation_token_count;
use stepwise_domain::usage::{ModelTokenData, TokenDataUpdate};
use stepwise_domain::{CompletionPromptTemplate, DomainError, Message, ModelSpec};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that end a decision cycle without an outcome
#[derive(Error, Debug)]
pub enum ProgressPlanStepError {
    /// The call itself succeeded, so its usage is still owed to the ledger
    #[error("Decision contract violated: {violation}")]
    ContractViolation {
        violation: ContractViolation,
        token_update: TokenDataUpdate,
    },

    #[error("Gateway error: {0}")]
    GatewayError(#[from] GatewayError),

    #[error("No active plan to decide on: {0}")]
    NoActivePlan(#[from] DomainError),
}

impl ProgressPlanStepError {
    /// Usage of a model call that completed before the cycle failed
    pub fn token_update(&self) -> Option<&TokenDataUpdate> {
        match self {
            ProgressPlanStepError::ContractViolation { token_update, .. } => Some(token_update),
            _ => None,
        }
    }
}

/// Where the pipeline goes after this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStage {
    /// Keep acting on the current plan item
    GenerateAction,
    /// Compact the conversation history first
    SummarizeHistory,
    /// Every item of the active revision is done
    RouteToReviewOrConclusion,
}

impl NextStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            NextStage::GenerateAction => "generate-action",
            NextStage::SummarizeHistory => "summarize-history",
            NextStage::RouteToReviewOrConclusion => "route-to-review-or-conclusion",
        }
    }
}

impl std::fmt::Display for NextStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened to the checkpoint document during the cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointStatus {
    /// No mutation, or no document bound
    Skipped,
    Persisted,
    /// The write failed; the next successful persist overwrites the document
    Failed(String),
}

/// Input for the ProgressPlanStep use case
#[derive(Debug, Clone)]
pub struct ProgressPlanStepInput {
    pub plan: TaskPlan,
    /// Conversation since work on the plan began (actions, results, user input)
    pub history: Vec<Message>,
    /// Document mirroring the plan, if any
    pub document: Option<DocumentId>,
}

impl ProgressPlanStepInput {
    pub fn new(plan: TaskPlan, history: Vec<Message>) -> Self {
        Self {
            plan,
            history,
            document: None,
        }
    }

    pub fn with_document(mut self, document: DocumentId) -> Self {
        self.document = Some(document);
        self
    }
}

/// Result of one decision cycle
#[derive(Debug, Clone)]
pub struct ProgressPlanStepOutput {
    pub decision: CompletionDecision,
    pub next_stage: NextStage,
    /// The plan after the cycle (unchanged unless an item was completed)
    pub plan: TaskPlan,
    /// Index of the item marked completed in this cycle
    pub completed_item: Option<usize>,
    /// Assistant decision and tool result, to append to the history
    pub new_messages: Vec<Message>,
    /// Estimated tokens of the summarizable history after this cycle
    pub conversation_tokens: usize,
    /// Usage of the decision call, to merge into the run's ledger
    pub token_update: TokenDataUpdate,
    pub checkpoint: CheckpointStatus,
}

/// Use case for one completion-decision cycle
pub struct ProgressPlanStepUseCase<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    model: ModelSpec,
    params: ArbiterParams,
    checkpoints: Option<CheckpointService>,
    logger: Arc<dyn ConversationLogger>,
}

impl<G: LlmGateway + 'static> ProgressPlanStepUseCase<G> {
    pub fn new(gateway: Arc<G>, model: ModelSpec) -> Self {
        Self {
            gateway,
            model,
            params: ArbiterParams::default(),
            checkpoints: None,
            logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_params(mut self, params: ArbiterParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_checkpoints(mut self, checkpoints: CheckpointService) -> Self {
        self.checkpoints = Some(checkpoints);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    fn build_request(&self, items: &[PlanItem], history: &[Message]) -> ModelRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::user(CompletionPromptTemplate::history_prefix(history)));
        messages.extend(history.iter().cloned());
        messages.push(Message::user(CompletionPromptTemplate::decision_suffix()));

        let request = ModelRequest::new(self.model.clone())
            .with_system(CompletionPromptTemplate::system())
            .with_system(CompletionPromptTemplate::plan_context(items))
            .with_messages(messages)
            .with_tools(decision::decision_tools())
            .with_tool_choice(ToolChoice::Any)
            .with_parallel_tool_calls(false);

        match self.params.max_tokens {
            Some(max) => request.with_max_tokens(max),
            None => request,
        }
    }

    fn budget_stage(&self, conversation_tokens: usize) -> NextStage {
        if conversation_tokens >= self.params.max_conversation_tokens {
            info!(
                conversation_tokens,
                max = self.params.max_conversation_tokens,
                "History at or above the token limit; routing to summarization"
            );
            NextStage::SummarizeHistory
        } else {
            NextStage::GenerateAction
        }
    }

    /// Run one decision cycle with default (no-op) progress
    pub async fn execute(
        &self,
        input: ProgressPlanStepInput,
    ) -> Result<ProgressPlanStepOutput, ProgressPlanStepError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Run one decision cycle with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: ProgressPlanStepInput,
        progress: &dyn ProgressNotifier,
    ) -> Result<ProgressPlanStepOutput, ProgressPlanStepError> {
        let ProgressPlanStepInput {
            plan,
            history,
            document,
        } = input;

        let task_id = plan::active_task(&plan)?.id.clone();
        let items = plan::active_plan_items(&plan)?;
        let current = plan::current_plan_item(&items).cloned();

        let request = self.build_request(&items, &history);
        debug!(model = %self.model, items = items.len(), "Requesting completion decision");
        progress.on_decision_start(&self.model, current.as_ref());
        let response = match self.gateway.invoke(&request).await {
            Ok(response) => response,
            Err(e) => {
                progress.on_decision_complete(None);
                return Err(e.into());
            }
        };

        let answered_by = response.model.clone().unwrap_or_else(|| self.model.key());
        let token_update = TokenDataUpdate::Merge(
            response
                .usage
                .iter()
                .map(|usage| ModelTokenData::from_usage(answered_by.clone(), usage))
                .collect(),
        );

        let calls = response.tool_calls();
        let (decision, call) =
            match decision::select_decision(&calls, self.params.reject_multiple_choices) {
                Ok(chosen) => chosen,
                Err(violation) => {
                    progress.on_decision_complete(None);
                    error!(error = %violation, model = %answered_by, "Completion decision contract violated");
                    self.logger.log(ConversationEvent::new(
                        events::CONTRACT_VIOLATION,
                        json!({
                            "model": answered_by,
                            "violation": violation.to_string(),
                            "actions": calls.iter().map(|c| c.tool_name.clone()).collect::<Vec<_>>(),
                        }),
                    ));
                    return Err(ProgressPlanStepError::ContractViolation {
                        violation,
                        token_update,
                    });
                }
            };

        progress.on_decision_complete(Some(&decision));
        let current_text = current.as_ref().map_or("unknown", |item| item.plan.as_str());
        info!(
            status = decision.status_label(),
            item = current.as_ref().map(|i| i.index),
            "Completion decision: {}",
            decision.text()
        );
        self.logger.log(ConversationEvent::new(
            events::COMPLETION_DECISION,
            json!({
                "model": answered_by,
                "task_id": task_id,
                "item_index": current.as_ref().map(|i| i.index),
                "completed": decision.is_completed(),
                "text": decision.text(),
            }),
        ));

        let new_messages = vec![
            Message::assistant_with_tool_calls(response.text_content(), vec![call.clone()]),
            Message::tool_result(
                call.native_id.clone().unwrap_or_default(),
                format!(
                    "Saved task status as {} for task {}",
                    decision.status_label(),
                    current_text
                ),
            ),
        ];
        let mut full_history = history;
        full_history.extend(new_messages.iter().cloned());
        let conversation_tokens =
            conversation_token_count(&full_history, self.params.retain_recent_messages);

        let summary = match &decision {
            CompletionDecision::Completed { summary } => Some(summary.clone()),
            CompletionDecision::NotCompleted { .. } => None,
        };
        let Some(summary) = summary else {
            return Ok(ProgressPlanStepOutput {
                next_stage: self.budget_stage(conversation_tokens),
                decision,
                plan,
                completed_item: None,
                new_messages,
                conversation_tokens,
                token_update,
                checkpoint: CheckpointStatus::Skipped,
            });
        };

        let Some(item) = current else {
            warn!(task_id = %task_id, "Model marked a task completed but no plan item is current");
            return Ok(ProgressPlanStepOutput {
                next_stage: NextStage::RouteToReviewOrConclusion,
                decision,
                plan,
                completed_item: None,
                new_messages,
                conversation_tokens,
                token_update,
                checkpoint: CheckpointStatus::Skipped,
            });
        };

        let (plan, completed_item) =
            match plan::complete_plan_item(plan.clone(), &task_id, item.index, summary) {
                Ok(updated) => {
                    self.logger.log(ConversationEvent::new(
                        events::PLAN_ITEM_COMPLETED,
                        json!({
                            "task_id": task_id,
                            "item_index": item.index,
                            "plan": item.plan,
                        }),
                    ));
                    (updated, Some(item.index))
                }
                Err(e) => {
                    warn!(error = %e, "Could not complete plan item; skipping this cycle");
                    (plan, None)
                }
            };

        let checkpoint = match (completed_item, &document) {
            (Some(_), Some(document)) => self.persist(document, &plan).await,
            _ => CheckpointStatus::Skipped,
        };
        if checkpoint != CheckpointStatus::Skipped {
            progress.on_checkpoint(checkpoint == CheckpointStatus::Persisted);
        }

        let remaining = plan::active_plan_items(&plan)?;
        let next_stage = match plan::current_plan_item(&remaining) {
            None => {
                info!(task_id = %task_id, "All plan items completed");
                NextStage::RouteToReviewOrConclusion
            }
            Some(next) => {
                debug!(next = next.index, "Moving to next plan item");
                self.budget_stage(conversation_tokens)
            }
        };

        Ok(ProgressPlanStepOutput {
            decision,
            next_stage,
            plan,
            completed_item,
            new_messages,
            conversation_tokens,
            token_update,
            checkpoint,
        })
    }

    async fn persist(&self, document: &DocumentId, plan: &TaskPlan) -> CheckpointStatus {
        let Some(checkpoints) = &self.checkpoints else {
            warn!(document = %document, "Document bound but no checkpoint service configured");
            return CheckpointStatus::Skipped;
        };

        match checkpoints.save_task_plan(document, plan).await {
            Ok(()) => CheckpointStatus::Persisted,
            Err(e) => {
                error!(document = %document, error = %e, "Failed to persist task plan checkpoint");
                self.logger.log(ConversationEvent::new(
                    events::CHECKPOINT_FAILED,
                    json!({ "document": document.to_string(), "error": e.to_string() }),
                ));
                CheckpointStatus::Failed(e.to_string())
            }
        }
    }
}
