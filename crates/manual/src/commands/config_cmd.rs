//! Config command handlers: init, show, path.

use std::io::IsTerminal;
use std::path::PathBuf;

use dialoguer::{Input, Select};

use manual_core::FailurePolicy;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Defaults};
use crate::error::CliError;
use crate::output;

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Io(std::io::Error::other(e.to_string()))
}

fn format_config(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# could not render config: {e}"))
}

pub fn handle(args: ConfigArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init { fixture, force } => {
            let path = config::config_path();
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let new = if global.yes {
                Config {
                    fixture,
                    defaults: Defaults::default(),
                }
            } else {
                if !std::io::stdin().is_terminal() {
                    return Err(CliError::NonInteractiveRequiresYes {
                        action: "config init".into(),
                    });
                }
                wizard(fixture, &path)?
            };

            let written = config::save_config(&new)?;
            if !global.quiet {
                eprintln!("✓ Configuration written to {}", written.display());
            }
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let out = output::render_single(&global.output_format(), cfg, format_config, |c| {
                c.fixture
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}

fn wizard(fixture: Option<PathBuf>, path: &std::path::Path) -> Result<Config, CliError> {
    eprintln!("manual-review configuration");
    eprintln!("   Config path: {}\n", path.display());

    let fixture: String = Input::new()
        .with_prompt("Default store fixture (blank for none)")
        .default(
            fixture
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        )
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let formats = manual_config::OUTPUT_FORMATS;
    let output = Select::new()
        .with_prompt("Output format")
        .items(formats)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let policies = &[
        "Leave a failed suggestion in flight",
        "Return a failed suggestion to pending",
    ];
    let policy = Select::new()
        .with_prompt("When a store call fails")
        .items(policies)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let timeout: u64 = Input::new()
        .with_prompt("Store call timeout (seconds)")
        .default(Defaults::default().request_timeout_secs)
        .interact_text()
        .map_err(prompt_err)?;

    Ok(Config {
        fixture: (!fixture.trim().is_empty()).then(|| PathBuf::from(fixture.trim())),
        defaults: Defaults {
            output: formats.get(output).copied().unwrap_or("table").into(),
            failure_policy: if policy == 0 {
                FailurePolicy::LeaveStuck
            } else {
                FailurePolicy::Rollback
            },
            request_timeout_secs: timeout,
            ..Defaults::default()
        },
    })
}
