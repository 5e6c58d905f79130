//! Command dispatch: bridges CLI args -> review session -> output formatting.

pub mod config_cmd;
pub mod review;
pub mod util;

use std::path::Path;
use std::sync::Arc;

use manual_core::{ManualId, MemoryStore, SessionConfig, SessionController, SuggestionStore};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// The store and controller one invocation reviews against.
pub struct ReviewContext {
    pub store: Arc<MemoryStore>,
    pub controller: SessionController,
}

impl ReviewContext {
    /// Seed an in-memory store from the fixture at `path`.
    pub fn load(path: &Path, session: SessionConfig) -> Result<Self, CliError> {
        let fixture = util::read_fixture(path)?;
        tracing::debug!(manuals = fixture.manuals.len(), "store fixture loaded");
        let store = Arc::new(MemoryStore::from_fixture(fixture));
        let controller =
            SessionController::new(Arc::clone(&store) as Arc<dyn SuggestionStore>, session);
        Ok(Self { store, controller })
    }

    /// Open a session for `manual`, failing if the store has no such manual.
    pub async fn open(&self, manual: &str) -> Result<(), CliError> {
        let id = ManualId::parse(manual)?;
        if self.store.manual(&id).is_none() {
            return Err(CliError::NotFound {
                resource_type: "house manual".into(),
                identifier: manual.into(),
                list_command: "config show".into(),
            });
        }
        self.controller.open(manual).await?;
        self.check()
    }

    /// Wait for in-flight work to be confirmed, then surface any failure
    /// the session recorded.
    pub async fn settle(&self) -> Result<(), CliError> {
        // A failed call may leave its suggestion marked in flight for good.
        self.check()?;
        let limit = self.controller.config().request_timeout;
        if !self.controller.settle(limit).await {
            return Err(CliError::Timeout {
                seconds: limit.as_secs(),
            });
        }
        self.check()
    }

    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        util::write_fixture(path, &self.store.export())
    }

    pub async fn shutdown(&self) -> Result<(), CliError> {
        if self.controller.state().is_open {
            self.controller.close().await?;
        }
        Ok(())
    }

    fn check(&self) -> Result<(), CliError> {
        match self.controller.state().error.clone() {
            Some(message) => Err(CliError::StoreFailure { message }),
            None => Ok(()),
        }
    }
}

/// Dispatch a review command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    ctx: &ReviewContext,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Show(args) => review::show(ctx, args, global).await,
        Command::Pending(args) => review::pending(ctx, args, global).await,
        Command::Accept(args) => review::accept(ctx, args, global).await,
        Command::Ignore(args) => review::ignore(ctx, args, global).await,
        Command::Combine(args) => review::combine(ctx, args, global).await,
        Command::AcceptAll(args) => review::accept_all(ctx, args, global).await,
        Command::Reuse(args) => review::reuse(ctx, args, global).await,
        Command::Transcript(args) => review::transcript(ctx, args, global).await,
        Command::Stage(args) => review::stage(ctx, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "configuration commands are not dispatched to a session".into(),
        )),
    }
}
