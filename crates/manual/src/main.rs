mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let mut cli = Cli::parse();

    // Config is read before tracing so its log filter can apply.
    let loaded = config::load_config();
    let log_filter = loaded
        .as_ref()
        .ok()
        .and_then(|cfg| cfg.defaults.log_filter.clone());
    init_tracing(cli.global.verbose, log_filter.as_deref(), cli.global.log_json);

    let result = match loaded {
        Ok(cfg) => {
            cli.global.apply_defaults(&cfg.defaults);
            run(cli, cfg).await
        }
        // `config path` and `completions` work without a readable config.
        Err(err) => match cli.command {
            Command::Config(_) | Command::Completions(_) => {
                tracing::warn!(error = %err, "ignoring unreadable config file");
                run(cli, config::Config::default()).await
            }
            _ => Err(err.into()),
        },
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, configured: Option<&str>, json: bool) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env()
            .ok()
            .or_else(|| configured.and_then(|f| EnvFilter::try_new(f).ok()))
            .unwrap_or_else(|| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli, cfg: config::Config) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a store
        Command::Config(args) => commands::config_cmd::handle(args, &cfg, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "manual-review", &mut std::io::stdout());
            Ok(())
        }

        // Everything else reviews against the fixture store
        cmd => {
            let fixture = config::resolve_fixture(&cli.global, &cfg)?;
            let session = config::resolve_session(&cli.global, &cfg)?;
            let ctx = commands::ReviewContext::load(&fixture, session)?;

            tracing::debug!(command = ?cmd, fixture = %fixture.display(), "dispatching command");
            let outcome = commands::dispatch(cmd, &ctx, &cli.global).await;

            // Saved even when the command failed: completed decisions stick.
            if cli.global.save {
                ctx.save(&fixture)?;
            }
            ctx.shutdown().await?;
            outcome
        }
    }
}
