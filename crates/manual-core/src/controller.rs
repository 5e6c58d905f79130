// ── Session controller ──
//
// Lifecycle management for a suggestion review session. Owns the session
// loop (the single writer of `SessionState`), issues store calls, folds
// their outcomes back in as actions, and forwards push updates from the
// store while a session is open.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{FailurePolicy, SessionConfig};
use crate::error::{CoreError, StoreError};
use crate::model::{Decision, ManualId, Suggestion, SuggestionId};
use crate::session::{Action, SessionState, SessionView, reduce};
use crate::store::{Subscription, SuggestionStore};
use crate::stream::StateStream;

// ── Action envelope ──────────────────────────────────────────────

/// An action tagged with the session epoch it was issued under.
struct ActionEnvelope {
    action: Action,
    epoch: u64,
    /// Resolved once the loop has applied (`true`) or dropped (`false`) it.
    ack: Option<oneshot::Sender<bool>>,
}

// ── Reports ──────────────────────────────────────────────────────

/// A suggestion whose store accept failed during [`SessionController::accept_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptFailure {
    pub id: SuggestionId,
    pub error: StoreError,
}

/// Outcome of [`SessionController::accept_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptAllReport {
    /// Confirmed records, in the order they were accepted.
    pub accepted: Vec<Suggestion>,
    pub failed: Vec<AcceptFailure>,
    /// Pending suggestions left alone because another operation held them.
    pub skipped: Vec<SuggestionId>,
}

impl AcceptAllReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Decide<'a> {
    Accept,
    Ignore,
    Combine(&'a str),
}

impl Decide<'_> {
    fn verb(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Ignore => "ignore",
            Self::Combine(_) => "combine",
        }
    }
}

// ── SessionController ────────────────────────────────────────────

/// The entry point for reviewing a house manual's suggestions.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. One controller runs one
/// session at a time; opening another manual closes the current one. The
/// store handle is shared across every session the controller runs.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: SessionConfig,
    store: Arc<dyn SuggestionStore>,
    action_tx: mpsc::Sender<ActionEnvelope>,
    state_rx: watch::Receiver<Arc<SessionState>>,
    accepted_tx: broadcast::Sender<Vec<Suggestion>>,
    /// Current session epoch. Actions tagged with any other value are stale.
    epoch: Arc<AtomicU64>,
    /// Suggestions with a store call that has not completed yet.
    in_flight: std::sync::Mutex<HashSet<SuggestionId>>,
    cancel: CancellationToken,
    /// Child token for the open session's push forwarders.
    session_cancel: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl SessionController {
    /// Create a controller and spawn its session loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(store: Arc<dyn SuggestionStore>, config: SessionConfig) -> Self {
        let (action_tx, action_rx) = mpsc::channel(config.action_buffer.max(1));
        let (state_tx, state_rx) = watch::channel(Arc::new(SessionState::default()));
        let (accepted_tx, _) = broadcast::channel(config.notify_buffer.max(1));
        let epoch = Arc::new(AtomicU64::new(0));
        let cancel = CancellationToken::new();
        let session_cancel = cancel.child_token();

        tokio::spawn(session_loop(
            action_rx,
            state_tx,
            Arc::clone(&epoch),
            cancel.clone(),
        ));

        Self {
            inner: Arc::new(ControllerInner {
                config,
                store,
                action_tx,
                state_rx,
                accepted_tx,
                epoch,
                in_flight: std::sync::Mutex::new(HashSet::new()),
                cancel,
                session_cancel: Mutex::new(session_cancel),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// The shared store handle.
    pub fn store(&self) -> &Arc<dyn SuggestionStore> {
        &self.inner.store
    }

    // ── Session lifecycle ────────────────────────────────────────

    /// Open a review session for `manual_id`.
    ///
    /// Closes any session already open, subscribes to push updates for the
    /// manual, then loads it. A failed load is recorded in the session's
    /// error; only an empty id is rejected with `Err`.
    pub async fn open(&self, manual_id: &str) -> Result<(), CoreError> {
        let manual_id = ManualId::parse(manual_id)?;
        if self.state().is_open {
            self.close().await?;
        }

        let epoch = self.advance_epoch();
        let session_cancel = self.inner.cancel.child_token();
        *self.inner.session_cancel.lock().await = session_cancel.clone();
        info!(manual_id = %manual_id, epoch, "opening review session");

        self.dispatch_at(
            epoch,
            Action::Open {
                manual_id: manual_id.clone(),
            },
        )
        .await?;

        self.spawn_forwarders(&manual_id, epoch, &session_cancel)
            .await?;

        match self.call(self.inner.store.fetch_manual(&manual_id)).await {
            Ok(manual) => {
                debug!(
                    manual_id = %manual_id,
                    suggestions = manual.suggestions.len(),
                    stage = %manual.progress_stage,
                    "house manual loaded"
                );
                self.dispatch_at(epoch, Action::SetManual(manual)).await
            }
            Err(e) => {
                warn!(manual_id = %manual_id, error = %e, "failed to load house manual");
                self.dispatch_at(
                    epoch,
                    Action::SetError(format!("Failed to fetch house manual: {e}")),
                )
                .await
            }
        }
    }

    /// Close the current session.
    ///
    /// Push subscriptions are torn down before the state resets, and any
    /// store completion still on its way is discarded when it arrives.
    pub async fn close(&self) -> Result<(), CoreError> {
        self.inner.session_cancel.lock().await.cancel();

        let handles: Vec<JoinHandle<()>> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }

        let epoch = self.advance_epoch();
        let manual_id = self.state().manual_id.clone();
        self.dispatch_at(epoch, Action::Close).await?;
        info!(manual_id = ?manual_id.as_ref().map(ManualId::as_str), epoch, "review session closed");
        Ok(())
    }

    /// Re-fetch the open manual and replace the local collection with it.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let state = self.state();
        let manual_id = state.manual_id.clone().ok_or(CoreError::NoSession)?;
        let epoch = self.current_epoch();

        self.dispatch_at(epoch, Action::SetLoading(true)).await?;
        match self.call(self.inner.store.fetch_manual(&manual_id)).await {
            Ok(manual) => self.dispatch_at(epoch, Action::SetManual(manual)).await,
            Err(e) => {
                warn!(manual_id = %manual_id, error = %e, "refresh failed");
                self.dispatch_at(
                    epoch,
                    Action::SetError(format!("Failed to fetch house manual: {e}")),
                )
                .await
            }
        }
    }

    // ── Decisions ────────────────────────────────────────────────

    /// Accept one suggestion.
    ///
    /// The suggestion is marked in flight before the store is called. On
    /// success nothing else changes locally: the confirmed record arrives
    /// through the push subscription.
    pub async fn accept(&self, id: impl Into<SuggestionId>) -> Result<(), CoreError> {
        self.decide(id.into(), Decide::Accept).await
    }

    pub async fn ignore(&self, id: impl Into<SuggestionId>) -> Result<(), CoreError> {
        self.decide(id.into(), Decide::Ignore).await
    }

    /// Replace a suggestion's content with `merged` and mark it combined.
    pub async fn combine(
        &self,
        id: impl Into<SuggestionId>,
        merged: &str,
    ) -> Result<(), CoreError> {
        if merged.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "combined content must not be empty".into(),
            });
        }
        self.decide(id.into(), Decide::Combine(merged)).await
    }

    /// Seed the draft with a suggestion's default merge text, returning it.
    pub async fn begin_combine(&self, id: impl Into<SuggestionId>) -> Result<String, CoreError> {
        let id = id.into();
        let state = self.require_open()?;
        let draft = state
            .suggestion(&id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "suggestion",
                id: id.to_string(),
            })?
            .combine_draft();
        self.dispatch(Action::SetDraft(draft.clone())).await?;
        Ok(draft)
    }

    /// Accept every pending suggestion, one store call at a time.
    ///
    /// A failed accept is recorded in the session error and the remaining
    /// suggestions are still attempted.
    pub async fn accept_all(&self) -> Result<AcceptAllReport, CoreError> {
        let before = self.require_open()?;
        let epoch = self.current_epoch();
        let mut report = AcceptAllReport::default();

        let already_flagged: HashSet<SuggestionId> = before
            .suggestions
            .iter()
            .filter(|s| s.being_processed)
            .map(|s| s.id.clone())
            .collect();

        self.dispatch_at(epoch, Action::BeginOpAll).await?;

        // Targets are whatever `BeginOpAll` marked, read back from the loop.
        let flagged = self.state();
        let mut claimed = Vec::new();
        for suggestion in flagged.suggestions.iter().filter(|s| {
            s.being_processed
                && s.decision == Decision::Pending
                && !already_flagged.contains(&s.id)
        }) {
            match self.claim(&suggestion.id) {
                Ok(guard) => claimed.push(guard),
                Err(_) => report.skipped.push(suggestion.id.clone()),
            }
        }
        debug!(count = claimed.len(), skipped = report.skipped.len(), "accepting all pending suggestions");

        for guard in claimed {
            match self.call(self.inner.store.accept(&guard.id)).await {
                Ok(record) => report.accepted.push(record),
                Err(error) => {
                    self.record_failure(epoch, &guard.id, Decide::Accept, &error)
                        .await?;
                    report.failed.push(AcceptFailure {
                        id: guard.id.clone(),
                        error,
                    });
                }
            }
        }

        if !report.accepted.is_empty() {
            self.notify_accepted(epoch, report.accepted.clone());
        }
        Ok(report)
    }

    /// Replace the collection with suggestions carried over from the most
    /// recent earlier manual of the same host and listing.
    pub async fn reuse_previous(&self) -> Result<(), CoreError> {
        let state = self.require_open()?;
        let manual = state.manual.as_ref().ok_or(CoreError::NoManualLoaded)?;
        let epoch = self.current_epoch();

        self.dispatch_at(epoch, Action::SetLoading(true)).await?;
        let result = self
            .call(
                self.inner
                    .store
                    .reuse_previous(&manual.id, &manual.host_id, &manual.listing_id),
            )
            .await;

        match result {
            Ok(suggestions) => {
                debug!(manual_id = %manual.id, count = suggestions.len(), "reused previous suggestions");
                self.dispatch_at(epoch, Action::SetSuggestions(suggestions))
                    .await?;
                self.dispatch_at(epoch, Action::SetLoading(false)).await
            }
            Err(e) => {
                warn!(manual_id = %manual.id, error = %e, "reuse previous failed");
                self.dispatch_at(
                    epoch,
                    Action::SetError(format!("Failed to reuse previous content: {e}")),
                )
                .await
            }
        }
    }

    // ── Navigation & presentation ────────────────────────────────

    pub async fn next(&self) -> Result<(), CoreError> {
        self.dispatch(Action::Next).await
    }

    pub async fn previous(&self) -> Result<(), CoreError> {
        self.dispatch(Action::Prev).await
    }

    pub async fn select(&self, index: usize) -> Result<(), CoreError> {
        self.dispatch(Action::SetCursor(index)).await
    }

    pub async fn toggle_transcript(&self) -> Result<(), CoreError> {
        self.dispatch(Action::ToggleTranscript).await
    }

    pub async fn set_draft(&self, text: impl Into<String>) -> Result<(), CoreError> {
        self.dispatch(Action::SetDraft(text.into())).await
    }

    pub async fn clear_error(&self) -> Result<(), CoreError> {
        self.dispatch(Action::ClearError).await
    }

    // ── State observation ────────────────────────────────────────

    /// Latest state snapshot.
    pub fn state(&self) -> Arc<SessionState> {
        self.inner.state_rx.borrow().clone()
    }

    pub fn view(&self) -> SessionView {
        SessionView::project(&self.inner.state_rx.borrow())
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> StateStream {
        StateStream::new(self.inner.state_rx.clone())
    }

    /// Subscribe to the "suggestions accepted" notification. Each message
    /// carries the records the store confirmed for one operation.
    pub fn accepted(&self) -> broadcast::Receiver<Vec<Suggestion>> {
        self.inner.accepted_tx.subscribe()
    }

    /// Wait until nothing is loading and no suggestion is marked in flight.
    /// Returns `false` if that did not happen within `limit`.
    pub async fn settle(&self, limit: Duration) -> bool {
        let mut stream = self.subscribe();
        let settled = stream.wait_for(|state| {
            !state.loading && state.suggestions.iter().all(|s| !s.being_processed)
        });
        matches!(tokio::time::timeout(limit, settled).await, Ok(Some(_)))
    }

    // ── Internals ────────────────────────────────────────────────

    async fn decide(&self, id: SuggestionId, decide: Decide<'_>) -> Result<(), CoreError> {
        let state = self.require_open()?;
        let suggestion = state.suggestion(&id).ok_or_else(|| CoreError::NotFound {
            entity: "suggestion",
            id: id.to_string(),
        })?;
        if suggestion.decision != Decision::Pending {
            return Err(CoreError::AlreadyDecided {
                id: id.to_string(),
                decision: suggestion.decision,
            });
        }
        let epoch = self.current_epoch();
        let guard = self.claim(&id)?;

        self.dispatch_at(epoch, Action::BeginOp(id.clone())).await?;

        let store = &self.inner.store;
        let result = match decide {
            Decide::Accept => self.call(store.accept(&id)).await,
            Decide::Ignore => self.call(store.ignore(&id)).await,
            Decide::Combine(merged) => self.call(store.combine(&id, merged)).await,
        };

        match result {
            Ok(record) => {
                debug!(suggestion_id = %id, decision = %record.decision, "store confirmed decision");
                if matches!(decide, Decide::Accept | Decide::Combine(_)) {
                    self.notify_accepted(epoch, vec![record]);
                }
            }
            Err(error) => self.record_failure(epoch, &id, decide, &error).await?,
        }
        drop(guard);
        Ok(())
    }

    async fn record_failure(
        &self,
        epoch: u64,
        id: &SuggestionId,
        decide: Decide<'_>,
        error: &StoreError,
    ) -> Result<(), CoreError> {
        let verb = decide.verb();
        warn!(suggestion_id = %id, op = verb, error = %error, "store call failed");
        self.dispatch_at(
            epoch,
            Action::SetError(format!("Failed to {verb} suggestion: {error}")),
        )
        .await?;
        if self.inner.config.failure_policy == FailurePolicy::Rollback {
            self.dispatch_at(epoch, Action::EndOp(id.clone())).await?;
        }
        Ok(())
    }

    /// Publish confirmed records unless the session they belong to is gone.
    fn notify_accepted(&self, epoch: u64, records: Vec<Suggestion>) {
        if epoch == self.current_epoch() {
            let _ = self.inner.accepted_tx.send(records);
        } else {
            debug!(stale_epoch = epoch, count = records.len(), "dropping accepted notification from a closed session");
        }
    }

    fn require_open(&self) -> Result<Arc<SessionState>, CoreError> {
        let state = self.state();
        if state.is_open {
            Ok(state)
        } else {
            Err(CoreError::NoSession)
        }
    }

    fn claim(&self, id: &SuggestionId) -> Result<InFlight<'_>, CoreError> {
        let mut set = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !set.insert(id.clone()) {
            return Err(CoreError::OperationInFlight { id: id.to_string() });
        }
        Ok(InFlight {
            set: &self.inner.in_flight,
            id: id.clone(),
        })
    }

    /// Bound a store call by the configured request timeout.
    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let limit = self.inner.config.request_timeout;
        tokio::time::timeout(limit, fut)
            .await
            .unwrap_or_else(|_| {
                Err(StoreError::Timeout {
                    timeout_secs: limit.as_secs(),
                })
            })
    }

    fn current_epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn advance_epoch(&self) -> u64 {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn dispatch(&self, action: Action) -> Result<(), CoreError> {
        self.dispatch_at(self.current_epoch(), action).await
    }

    /// Send an action to the session loop and wait until it is handled.
    async fn dispatch_at(&self, epoch: u64, action: Action) -> Result<(), CoreError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.inner
            .action_tx
            .send(ActionEnvelope {
                action,
                epoch,
                ack: Some(ack_tx),
            })
            .await
            .map_err(|_| CoreError::Internal("session loop stopped".into()))?;
        ack_rx
            .await
            .map_err(|_| CoreError::Internal("session loop stopped".into()))?;
        Ok(())
    }

    async fn spawn_forwarders(
        &self,
        manual_id: &ManualId,
        epoch: u64,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        let store = &self.inner.store;
        let mut handles = self.inner.task_handles.lock().await;

        match self.call(store.subscribe_suggestions(manual_id)).await {
            Ok(sub) => handles.push(tokio::spawn(forward_pushes(
                sub,
                Action::UpsertSuggestion,
                self.inner.action_tx.clone(),
                epoch,
                cancel.clone(),
            ))),
            Err(e) => {
                warn!(manual_id = %manual_id, error = %e, "suggestion subscription failed");
                self.dispatch_at(
                    epoch,
                    Action::SetError(format!("Failed to subscribe to suggestion updates: {e}")),
                )
                .await?;
            }
        }

        match self.call(store.subscribe_manual(manual_id)).await {
            Ok(sub) => handles.push(tokio::spawn(forward_pushes(
                sub,
                Action::SetManual,
                self.inner.action_tx.clone(),
                epoch,
                cancel.clone(),
            ))),
            Err(e) => {
                warn!(manual_id = %manual_id, error = %e, "manual subscription failed");
                self.dispatch_at(
                    epoch,
                    Action::SetError(format!("Failed to subscribe to progress updates: {e}")),
                )
                .await?;
            }
        }

        debug!(manual_id = %manual_id, forwarders = handles.len(), "push subscriptions established");
        Ok(())
    }
}

// ── In-flight guard ──────────────────────────────────────────────

/// Holds a suggestion id in the in-flight set until dropped.
struct InFlight<'a> {
    set: &'a std::sync::Mutex<HashSet<SuggestionId>>,
    id: SuggestionId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Apply actions one at a time and publish every resulting state.
async fn session_loop(
    mut rx: mpsc::Receiver<ActionEnvelope>,
    state_tx: watch::Sender<Arc<SessionState>>,
    epoch: Arc<AtomicU64>,
    cancel: CancellationToken,
) {
    let mut state = SessionState::default();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let current = epoch.load(Ordering::SeqCst);
                let applied = envelope.epoch == current;

                if applied {
                    debug!(action = envelope.action.name(), epoch = current, "applying action");
                    state = reduce(state, envelope.action);
                    let next = state.clone();
                    state_tx.send_if_modified(|published| {
                        if **published == next {
                            false
                        } else {
                            *published = Arc::new(next);
                            true
                        }
                    });
                } else {
                    warn!(
                        action = envelope.action.name(),
                        stale_epoch = envelope.epoch,
                        epoch = current,
                        "dropping action from a closed session"
                    );
                }

                if let Some(ack) = envelope.ack {
                    let _ = ack.send(applied);
                }
            }
        }
    }
    debug!("session loop stopped");
}

/// Turn every item of a push subscription into an action for the loop.
async fn forward_pushes<T: Send + 'static>(
    mut sub: Subscription<T>,
    to_action: fn(T) -> Action,
    action_tx: mpsc::Sender<ActionEnvelope>,
    epoch: u64,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            item = sub.next() => {
                let Some(item) = item else { break };
                let envelope = ActionEnvelope {
                    action: to_action(item),
                    epoch,
                    ack: None,
                };
                if action_tx.send(envelope).await.is_err() {
                    break;
                }
            }
        }
    }
}
