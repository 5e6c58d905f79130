//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use manual_core::StoreFixture;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.trim_end_matches('?').into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

pub fn read_fixture(path: &Path) -> Result<StoreFixture, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::FixtureRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::FixtureFormat {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `fixture` as pretty JSON, replacing the file atomically.
pub fn write_fixture(path: &Path, fixture: &StoreFixture) -> Result<(), CliError> {
    let json =
        serde_json::to_string_pretty(fixture).map_err(|e| CliError::Render(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, format!("{json}\n"))?;
    std::fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), manuals = fixture.manuals.len(), "store fixture saved");
    Ok(())
}

/// Shorten `text` to at most `max` characters on one line.
pub fn truncate(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut short: String = flat.chars().take(max.saturating_sub(1)).collect();
    short.push('…');
    short
}
