//! CLI entrypoint for stepwise
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use stepwise_application::{
    CheckpointService, ConversationLogger, DocumentId, DocumentStore, NoConversationLogger,
    NoProgress, ProgressNotifier, ProgressPlanStepInput, ProgressPlanStepUseCase,
};
use stepwise_domain::{ConfigIssue, Message, ModelSpec, ModelTokenData, TokenDataUpdate};
use stepwise_infrastructure::{
    AnthropicProvider, ConfigLoader, DocumentRouter, FallbackGateway, FileConfig,
    FileDocumentStore, GitHubIssueStore, GoogleGenAiProvider, JsonlConversationLogger,
    OpenAiProvider, ProviderAdapter, ProviderHealthRegistry, ProviderKind,
};
use stepwise_presentation::{
    Cli, Command, ConsoleFormatter, OutputFormat, ProgressReporter, SimpleProgress,
};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(cli.verbose, cli.log_dir.as_deref());

    info!("Starting stepwise");

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    let issues = config.validate();
    if let Command::Config = cli.command {
        print_config(&cli, &config, &issues);
        return Ok(());
    }
    for issue in &issues {
        warn!(code = ?issue.code, "{}", issue.message);
    }

    let Some(doc) = cli.command.document().cloned() else {
        return Ok(());
    };

    // === Dependency Injection ===
    let checkpoints = CheckpointService::new(build_documents(&doc).await?);
    let now = chrono::Utc::now().timestamp_millis();

    match cli.command {
        Command::Show { .. } => {
            let snapshot = checkpoints.snapshot(&doc).await?;
            match cli.output {
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_snapshot(&doc, &snapshot)),
                OutputFormat::Json => println!("{}", ConsoleFormatter::format_snapshot_json(&snapshot)),
            }
        }

        Command::Complete {
            item,
            summary,
            task,
            ..
        } => {
            let plan = checkpoints
                .complete_item(&doc, task.as_deref(), item, summary)
                .await?;
            match cli.output {
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_task_plan(&plan)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
            }
        }

        Command::Usage { add, replace, .. } => {
            let entries = match add {
                Some(path) => {
                    let delta = read_json::<Vec<ModelTokenData>>(&path)?;
                    if replace {
                        checkpoints.save(&doc, &delta).await?;
                        delta
                    } else {
                        checkpoints.record_token_usage(&doc, delta).await?
                    }
                }
                None => checkpoints
                    .load::<Vec<ModelTokenData>>(&doc)
                    .await?
                    .unwrap_or_default(),
            };
            match cli.output {
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_token_data(&entries)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
            }
        }

        Command::Propose { steps, .. } => {
            let count = steps.len();
            checkpoints.propose_plan(&doc, steps).await?;
            if !cli.quiet {
                println!("{} Proposed a {}-step plan in {}", "v".green(), count, doc);
            }
        }

        Command::Accept { request, .. } => {
            let plan = checkpoints.accept_proposed_plan(&doc, request, now).await?;
            match cli.output {
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_task_plan(&plan)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
            }
        }

        Command::Decide {
            transcript,
            model,
            dry_run,
            ..
        } => {
            let model = match model {
                Some(spec) => spec.parse::<ModelSpec>()?,
                None => config
                    .models
                    .parse_decision()
                    .0
                    .ok_or_else(|| anyhow!("models.decision is not a valid provider:model"))?,
            };

            let plan = checkpoints.load_task_plan(&doc).await?.ok_or_else(|| {
                anyhow!("{} has no task plan; propose and accept a plan first", doc)
            })?;
            let history = read_json::<Vec<Message>>(&transcript)?;

            let gateway = Arc::new(build_gateway(&config)?);
            let mut use_case = ProgressPlanStepUseCase::new(gateway.clone(), model)
                .with_params(config.arbiter.to_params())
                .with_logger(build_logger(&config));
            let mut input = ProgressPlanStepInput::new(plan, history);
            if !dry_run {
                use_case = use_case.with_checkpoints(checkpoints.clone());
                input = input.with_document(doc.clone());
            }

            let progress: Box<dyn ProgressNotifier> = match (cli.quiet, cli.output) {
                (true, _) => Box::new(NoProgress),
                (false, OutputFormat::Json) => Box::new(SimpleProgress),
                (false, OutputFormat::Text) => Box::new(ProgressReporter::new()),
            };
            let outcome = match use_case
                .execute_with_progress(input, progress.as_ref())
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    if !dry_run && let Some(update) = e.token_update() {
                        record_usage(&checkpoints, &doc, update.clone()).await;
                    }
                    return Err(e.into());
                }
            };

            for health in gateway.health().snapshot() {
                debug!(
                    provider = %health.key,
                    state = %health.state,
                    failures = health.failure_count,
                    "Provider health"
                );
            }

            if !dry_run {
                record_usage(&checkpoints, &doc, outcome.token_update.clone()).await;
            }

            match cli.output {
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_outcome(&outcome)),
                OutputFormat::Json => println!("{}", ConsoleFormatter::format_outcome_json(&outcome)),
            }
        }

        Command::Config => {}
    }

    Ok(())
}

fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Initialize logging based on verbosity level
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let stderr = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "stepwise.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(EnvFilter::new(level))
                .with(stderr)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(EnvFilter::new(level))
                .with(stderr)
                .init();
            None
        }
    }
}

async fn build_documents(doc: &DocumentId) -> Result<Arc<dyn DocumentStore>> {
    let mut router = DocumentRouter::new().with_files(Arc::new(FileDocumentStore::new()));

    // Probing gh costs a subprocess, so only do it for issue documents
    if let DocumentId::GitHubIssue { .. } = doc {
        let Some(github) = GitHubIssueStore::try_new(None).await else {
            bail!("{} needs the gh CLI, installed and authenticated (gh auth login)", doc);
        };
        router = router.with_github(Arc::new(github));
    }
    Ok(Arc::new(router))
}

/// Register every provider that has credentials, in the configured fallback order.
fn build_gateway(config: &FileConfig) -> Result<FallbackGateway> {
    let health = Arc::new(ProviderHealthRegistry::new(config.gateway.breaker_config()));
    let (order, _) = config.gateway.parse_fallback_order();

    let mut gateway = FallbackGateway::new(health)
        .with_attempt_timeout(config.gateway.attempt_timeout());
    let mut registered = 0;

    for kind in ProviderKind::ALL {
        let adapter: Result<Arc<dyn ProviderAdapter>, _> = match kind {
            ProviderKind::Anthropic => AnthropicProvider::new(&config.providers.anthropic)
                .map(|p| Arc::new(p) as Arc<dyn ProviderAdapter>),
            ProviderKind::GoogleGenAi => GoogleGenAiProvider::new(&config.providers.google_genai)
                .map(|p| Arc::new(p) as Arc<dyn ProviderAdapter>),
            ProviderKind::OpenAi => OpenAiProvider::new(&config.providers.openai)
                .map(|p| Arc::new(p) as Arc<dyn ProviderAdapter>),
        };
        match adapter {
            Ok(adapter) => {
                let default_model = config.gateway.default_model(kind).unwrap_or_default();
                gateway = gateway.with_provider(adapter, default_model);
                registered += 1;
            }
            Err(e) => warn!(provider = %kind, "Provider disabled: {}", e),
        }
    }

    if registered == 0 {
        bail!("No model provider is configured; set ANTHROPIC_API_KEY, GOOGLE_API_KEY or OPENAI_API_KEY");
    }
    Ok(gateway.with_fallback_order(order))
}

fn build_logger(config: &FileConfig) -> Arc<dyn ConversationLogger> {
    match config
        .logging
        .conversation_log
        .as_ref()
        .and_then(JsonlConversationLogger::new)
    {
        Some(logger) => {
            info!(path = %logger.path().display(), "Decision transcript enabled");
            Arc::new(logger)
        }
        None => Arc::new(NoConversationLogger),
    }
}

/// Merge a decision call's usage into the document; failures only warn.
async fn record_usage(checkpoints: &CheckpointService, doc: &DocumentId, update: TokenDataUpdate) {
    let result = match update {
        TokenDataUpdate::Merge(delta) if delta.is_empty() => return,
        TokenDataUpdate::Merge(delta) => checkpoints.record_token_usage(doc, delta).await.map(drop),
        TokenDataUpdate::Replace(entries) => checkpoints.save(doc, &entries).await,
    };
    if let Err(e) = result {
        warn!(document = %doc, error = %e, "Failed to record token usage");
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_config(cli: &Cli, config: &FileConfig, issues: &[ConfigIssue]) {
    println!("{}", "Configuration sources (lowest priority first):".cyan().bold());
    if cli.no_config {
        println!("  {} built-in defaults only (--no-config)", "v".green());
    } else {
        for source in ConfigLoader::sources(cli.config.as_ref()) {
            let mark = if source.found {
                "v".green()
            } else {
                "-".dimmed()
            };
            println!("  {} {:<10} {}", mark, source.label, source.location);
        }
    }

    println!();
    println!("{} {}", "Decision model:".cyan().bold(), config.models.decision);
    println!(
        "{} {}",
        "Fallback order:".cyan().bold(),
        config.gateway.fallback_order.join(", ")
    );

    println!();
    if issues.is_empty() {
        println!("{} no issues", "v".green());
    } else {
        print!("{}", ConsoleFormatter::format_issues(issues));
    }
}
