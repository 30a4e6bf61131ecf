//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use stepwise_application::DocumentId;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored when the terminal supports it
    Text,
    /// JSON output
    Json,
}

/// CLI arguments for stepwise
#[derive(Parser, Debug)]
#[command(name = "stepwise")]
#[command(author, version, about = "Track agent task plans in issue bodies and decide when a step is done")]
#[command(long_about = r#"
Stepwise keeps an agent's task plan, proposed plan and token usage inside a
collapsible "Agent Context" block of an external document (a GitHub issue
body or a local file), and asks a model whether the current plan item is
complete.

Documents are addressed as:
  path/to/file.md        a local file
  gh:owner/repo#123      a GitHub issue (via the gh CLI)
  gh:#123                an issue in the current repository

Configuration files are loaded from (in priority order):
1. STEPWISE_* environment variables (e.g. STEPWISE_GATEWAY__FAILURE_THRESHOLD=5)
2. --config <path>     Explicit config file
3. ./stepwise.toml     Project-level config
4. ~/.config/stepwise/config.toml   Global config

Example:
  stepwise propose gh:#42 "Reproduce the failure" "Fix the race" "Add a regression test"
  stepwise accept gh:#42
  stepwise decide gh:#42 --transcript run.json
  stepwise show gh:#42
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Also write diagnostics to daily-rolling files in this directory
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the task plan, proposed plan and token usage stored in a document
    Show {
        /// Document holding the checkpoint
        doc: DocumentId,
    },

    /// Mark a plan item of the active revision completed
    Complete {
        doc: DocumentId,

        /// Index of the plan item
        #[arg(long)]
        item: usize,

        /// What was done
        #[arg(long)]
        summary: String,

        /// Task id (defaults to the active task)
        #[arg(long)]
        task: Option<String>,
    },

    /// Show token usage, or merge usage from a JSON file
    Usage {
        doc: DocumentId,

        /// JSON array of per-model usage entries to merge
        #[arg(long, value_name = "FILE")]
        add: Option<PathBuf>,

        /// Overwrite the stored usage instead of merging
        #[arg(long, requires = "add")]
        replace: bool,
    },

    /// Store a proposed plan awaiting acceptance
    Propose {
        doc: DocumentId,

        /// Plan steps, in order
        #[arg(required = true, value_name = "STEP")]
        steps: Vec<String>,
    },

    /// Turn the proposed plan into a new task
    Accept {
        doc: DocumentId,

        /// Request text for the task (defaults to the document text)
        #[arg(long)]
        request: Option<String>,
    },

    /// Ask the decision model whether the current plan item is done
    Decide {
        doc: DocumentId,

        /// JSON array of conversation messages since work on the plan began
        #[arg(long, value_name = "FILE")]
        transcript: PathBuf,

        /// Decision model (`provider:model`), overriding the config
        #[arg(short, long, value_name = "MODEL")]
        model: Option<String>,

        /// Print the outcome without writing the document
        #[arg(long)]
        dry_run: bool,
    },

    /// Show configuration sources and validation issues
    Config,
}

impl Command {
    /// The document the command operates on, if any
    pub fn document(&self) -> Option<&DocumentId> {
        match self {
            Command::Show { doc }
            | Command::Complete { doc, .. }
            | Command::Usage { doc, .. }
            | Command::Propose { doc, .. }
            | Command::Accept { doc, .. }
            | Command::Decide { doc, .. } => Some(doc),
            Command::Config => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_complete() {
        let cli = Cli::parse_from([
            "stepwise", "complete", "gh:octo/widgets#42", "--item", "1", "--summary", "Fixed",
        ]);
        match cli.command {
            Command::Complete { doc, item, summary, task } => {
                assert_eq!(doc.to_string(), "gh:octo/widgets#42");
                assert_eq!(item, 1);
                assert_eq!(summary, "Fixed");
                assert!(task.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["stepwise", "show", "plan.md", "-vv", "-o", "json"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_document_of_command() {
        let cli = Cli::parse_from(["stepwise", "propose", "plan.md", "Look", "Patch"]);
        assert_eq!(cli.command.document().map(ToString::to_string).as_deref(), Some("plan.md"));
        assert!(Cli::parse_from(["stepwise", "config"]).command.document().is_none());
    }

    #[test]
    fn test_propose_requires_steps() {
        assert!(Cli::try_parse_from(["stepwise", "propose", "plan.md"]).is_err());
    }

    #[test]
    fn test_bad_document_id_is_rejected() {
        assert!(Cli::try_parse_from(["stepwise", "show", "gh:octo/widgets"]).is_err());
    }
}
