//! CLI configuration: a thin wrapper around `manual_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--fixture, --timeout).

use std::path::PathBuf;
use std::time::Duration;

use manual_core::SessionConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use manual_config::{Config, Defaults, config_path, load_config, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the store fixture path (flag > env > config).
pub fn resolve_fixture(global: &GlobalOpts, config: &Config) -> Result<PathBuf, CliError> {
    global
        .fixture
        .clone()
        .or_else(|| config.fixture.clone())
        .ok_or(CliError::NoFixture)
}

/// Session tuning from the config file with the `--timeout` override applied.
pub fn resolve_session(global: &GlobalOpts, config: &Config) -> Result<SessionConfig, CliError> {
    let mut session = config.session_config();
    if let Some(secs) = global.timeout {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        session.request_timeout = Duration::from_secs(secs);
    }
    Ok(session)
}
