//! Clap derive structures for the `manual-review` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use manual_core::ProgressStage;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// manual-review -- review AI suggestions for house manuals
#[derive(Debug, Parser)]
#[command(
    name = "manual-review",
    version,
    about = "Review AI-generated house manual suggestions from the command line",
    long_about = "Accept, ignore or combine the suggestions generated for a house manual.\n\n\
        Records are read from a JSON store fixture; pass --save to write the\n\
        outcome of a command back to it.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Store fixture (JSON) to review against
    #[arg(long, short = 'f', env = "MANUAL_FIXTURE", global = true)]
    pub fixture: Option<PathBuf>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "MANUAL_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Write the store back to the fixture after the command
    #[arg(long, global = true)]
    pub save: bool,

    /// Store call timeout in seconds (overrides config)
    #[arg(long, env = "MANUAL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

impl GlobalOpts {
    /// Fill unset presentation options from the config file defaults.
    pub fn apply_defaults(&mut self, defaults: &manual_config::Defaults) {
        if self.output.is_none() {
            self.output = OutputFormat::from_str(&defaults.output, true).ok();
        }
        if self.color.is_none() {
            self.color = ColorMode::from_str(&defaults.color, true).ok();
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output.clone().unwrap_or(OutputFormat::Table)
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color.clone().unwrap_or(ColorMode::Auto)
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show a house manual's review state and every suggestion
    Show(ManualArgs),

    /// List suggestions still awaiting a decision
    #[command(alias = "ls")]
    Pending(ManualArgs),

    /// Accept one suggestion
    Accept(SuggestionArgs),

    /// Ignore one suggestion
    Ignore(SuggestionArgs),

    /// Merge a suggestion with the content it would replace
    Combine(CombineArgs),

    /// Accept every pending suggestion
    AcceptAll(ManualArgs),

    /// Replace the suggestions with those of the previous manual
    Reuse(ManualArgs),

    /// Print the transcript suggestions were generated from
    Transcript(ManualArgs),

    /// Move a manual to another progress stage
    Stage(StageArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Review arguments ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ManualArgs {
    /// House manual id
    pub manual: String,
}

#[derive(Debug, Args)]
pub struct SuggestionArgs {
    /// House manual id
    pub manual: String,

    /// Suggestion id
    pub id: String,
}

#[derive(Debug, Args)]
pub struct CombineArgs {
    /// House manual id
    pub manual: String,

    /// Suggestion id
    pub id: String,

    /// Merged content [default: previous content, a blank line, the suggestion]
    #[arg(long, short = 't')]
    pub text: Option<String>,
}

#[derive(Debug, Args)]
pub struct StageArgs {
    /// House manual id
    pub manual: String,

    /// New progress stage
    #[arg(value_parser = parse_stage)]
    pub stage: ProgressStage,
}

fn parse_stage(raw: &str) -> Result<ProgressStage, String> {
    raw.to_ascii_lowercase().parse().map_err(|_| {
        "expected one of idle, transcribing, analyzing, generating, ready, complete, error"
            .to_owned()
    })
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file (interactive unless --yes)
    Init {
        /// Default store fixture to record in the config
        #[arg(long = "default-fixture")]
        fixture: Option<PathBuf>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
