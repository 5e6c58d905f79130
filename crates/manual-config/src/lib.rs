//! Shared configuration for the manual-review tools.
//!
//! A TOML file at the platform config path, overlaid with `MANUAL_`
//! environment variables, translated into `manual_core::SessionConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use manual_core::{FailurePolicy, SessionConfig};

/// Output formats the CLI knows how to render.
pub const OUTPUT_FORMATS: &[&str] = &["table", "json", "json-compact", "yaml", "plain"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Store fixture used when `--fixture` is not given.
    pub fixture: Option<PathBuf>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Upper bound on a single store call, in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// `tracing` filter directive used when neither `-v` nor `RUST_LOG` is set.
    pub log_filter: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            request_timeout_secs: default_timeout(),
            failure_policy: FailurePolicy::default(),
            log_filter: None,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.request_timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "defaults.request_timeout_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if !OUTPUT_FORMATS.contains(&self.defaults.output.as_str()) {
            return Err(ConfigError::Validation {
                field: "defaults.output".into(),
                reason: format!(
                    "expected one of {}, got '{}'",
                    OUTPUT_FORMATS.join(", "),
                    self.defaults.output
                ),
            });
        }
        if !matches!(self.defaults.color.as_str(), "auto" | "always" | "never") {
            return Err(ConfigError::Validation {
                field: "defaults.color".into(),
                reason: format!(
                    "expected 'auto', 'always', or 'never', got '{}'",
                    self.defaults.color
                ),
            });
        }
        Ok(())
    }

    /// Session tuning derived from the configured defaults.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            request_timeout: Duration::from_secs(self.defaults.request_timeout_secs),
            failure_policy: self.defaults.failure_policy,
            ..SessionConfig::default()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "manual-review", "manual-review").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("manual-review");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Environment keys nest with a double underscore, e.g.
/// `MANUAL_DEFAULTS__REQUEST_TIMEOUT_SECS=10` or `MANUAL_FIXTURE=demo.json`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MANUAL_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    cfg.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.defaults.output, "table");
        assert_eq!(config.defaults.request_timeout_secs, 30);
        assert_eq!(config.defaults.failure_policy, FailurePolicy::LeaveStuck);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
fixture = "/srv/manuals.json"

[defaults]
output = "json"
request_timeout_secs = 5
failure_policy = "rollback"
log_filter = "manual_core=debug"
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.fixture, Some(PathBuf::from("/srv/manuals.json")));
        assert_eq!(config.defaults.output, "json");
        assert_eq!(config.defaults.color, "auto");
        assert_eq!(config.defaults.log_filter.as_deref(), Some("manual_core=debug"));

        let session = config.session_config();
        assert_eq!(session.request_timeout, Duration::from_secs(5));
        assert_eq!(session.failure_policy, FailurePolicy::Rollback);
        assert_eq!(session.action_buffer, SessionConfig::default().action_buffer);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults]\nrequest_timeout_secs = 0\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "defaults.request_timeout_secs"),
            "got: {err}"
        );
    }

    #[test]
    fn unknown_output_is_rejected() {
        let config = Config {
            defaults: Defaults {
                output: "xml".into(),
                ..Defaults::default()
            },
            fixture: None,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            defaults: Defaults {
                output: "yaml".into(),
                failure_policy: FailurePolicy::Rollback,
                ..Defaults::default()
            },
            fixture: Some(dir.path().join("store.json")),
        };

        save_config_to(&path, &config).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }
}
