//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use manual_config::ConfigError;
use manual_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(manual_review::not_found),
        help("Run: manual-review {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Suggestion '{id}' is already being processed")]
    #[diagnostic(
        code(manual_review::in_flight),
        help("Wait for the pending store call to finish and try again.")
    )]
    InFlight { id: String },

    #[error("Suggestion '{id}' is already {decision}")]
    #[diagnostic(
        code(manual_review::already_decided),
        help("Decisions are final. Run: manual-review pending <MANUAL> to see what is left.")
    )]
    AlreadyDecided { id: String, decision: String },

    // ── Review outcome ───────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(manual_review::store_failure),
        help("The store rejected or never answered the request. Re-run with -v for details.")
    )]
    StoreFailure { message: String },

    #[error("{failed} of {attempted} suggestions could not be accepted")]
    #[diagnostic(
        code(manual_review::partial_accept),
        help("Accepted suggestions are kept. Run the command again to retry the rest.")
    )]
    PartialAccept { failed: usize, attempted: usize },

    #[error("Store did not confirm the change within {seconds}s")]
    #[diagnostic(
        code(manual_review::timeout),
        help("Increase the timeout with --timeout or defaults.request_timeout_secs.")
    )]
    Timeout { seconds: u64 },

    #[error("Store error: {message}")]
    #[diagnostic(code(manual_review::transport))]
    Transport { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(manual_review::validation))]
    Validation { field: String, reason: String },

    // ── Fixture ──────────────────────────────────────────────────────
    #[error("No store fixture given")]
    #[diagnostic(
        code(manual_review::no_fixture),
        help(
            "Pass --fixture <FILE>, set MANUAL_FIXTURE, or record one with:\n\
             manual-review config init --default-fixture <FILE>"
        )
    )]
    NoFixture,

    #[error("Could not read store fixture {}", path.display())]
    #[diagnostic(code(manual_review::fixture_read))]
    FixtureRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store fixture {} is not valid", path.display())]
    #[diagnostic(
        code(manual_review::fixture_format),
        help("A fixture is a JSON object with a \"manuals\" array.")
    )]
    FixtureFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(manual_review::config_exists),
        help("Pass --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(manual_review::config))]
    Config(#[from] ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(manual_review::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(manual_review::render))]
    Render(String),

    #[error("Internal error: {0}")]
    #[diagnostic(code(manual_review::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::InFlight { .. } | Self::AlreadyDecided { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Transport { .. } => exit_code::CONNECTION,
            Self::Validation { .. } | Self::NoFixture | Self::NonInteractiveRequiresYes { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => CliError::NotFound {
                resource_type: entity.into(),
                identifier: id,
                list_command: if entity == "suggestion" {
                    "show <MANUAL>".into()
                } else {
                    "config show".into()
                },
            },

            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::OperationInFlight { id } => CliError::InFlight { id },

            CoreError::AlreadyDecided { id, decision } => CliError::AlreadyDecided {
                id,
                decision: decision.to_string(),
            },

            CoreError::Transport { message } => CliError::Transport { message },

            CoreError::NoSession | CoreError::NoManualLoaded => {
                CliError::Internal(err.to_string())
            }

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
