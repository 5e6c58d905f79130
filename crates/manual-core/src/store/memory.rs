// ── In-process suggestion store ──
//
// Lock-free record storage with broadcast push notification, seeded from a
// JSON fixture. Besides serving the CLI it doubles as the test double for
// the controller: every call is logged, failures can be injected per
// operation or per suggestion, and automatic pushes can be switched off so
// a test decides exactly when a confirmation arrives.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Subscription, SuggestionStore};
use crate::error::StoreError;
use crate::model::{
    Decision, HostId, HouseManual, ListingId, ManualId, ProgressStage, Suggestion, SuggestionId,
};

const PUSH_CAPACITY: usize = 256;

/// Serialized form of a store: every manual with its nested suggestions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    pub manuals: Vec<HouseManual>,
}

/// Store operation names, used by the call log and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StoreOp {
    FetchManual,
    FetchPending,
    Accept,
    Ignore,
    Combine,
    ReusePrevious,
    UpdateProgressStage,
    SubscribeSuggestions,
    SubscribeManual,
}

/// One logged call: the operation and the id it targeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub target: String,
}

impl StoreCall {
    pub fn new(op: StoreOp, target: impl Into<String>) -> Self {
        Self {
            op,
            target: target.into(),
        }
    }
}

struct StoredSuggestion {
    seq: u64,
    record: Suggestion,
}

pub struct MemoryStore {
    /// Manual records; their `suggestions` field is kept empty.
    manuals: DashMap<ManualId, HouseManual>,
    suggestions: DashMap<SuggestionId, StoredSuggestion>,
    next_seq: AtomicU64,

    suggestion_tx: broadcast::Sender<Suggestion>,
    manual_tx: broadcast::Sender<HouseManual>,
    auto_push: AtomicBool,

    calls: Mutex<Vec<StoreCall>>,
    failures: DashMap<(StoreOp, Option<SuggestionId>), StoreError>,
    latency_ms: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (suggestion_tx, _) = broadcast::channel(PUSH_CAPACITY);
        let (manual_tx, _) = broadcast::channel(PUSH_CAPACITY);
        Self {
            manuals: DashMap::new(),
            suggestions: DashMap::new(),
            next_seq: AtomicU64::new(0),
            suggestion_tx,
            manual_tx,
            auto_push: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
            failures: DashMap::new(),
            latency_ms: AtomicU64::new(0),
        }
    }

    pub fn from_fixture(fixture: StoreFixture) -> Self {
        let store = Self::new();
        for manual in fixture.manuals {
            store.insert_manual(manual);
        }
        store
    }

    /// Stop pushing writes automatically. Confirmations are then delivered
    /// only through [`push_suggestion`](Self::push_suggestion),
    /// [`push_stored`](Self::push_stored) and [`push_manual`](Self::push_manual).
    #[must_use]
    pub fn with_manual_confirmation(self) -> Self {
        self.set_auto_push(false);
        self
    }

    pub fn set_auto_push(&self, enabled: bool) {
        self.auto_push.store(enabled, Ordering::SeqCst);
    }

    /// Delay applied to every call before it touches any record.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    // ── Seeding & inspection ─────────────────────────────────────────

    /// Insert or replace a manual together with its nested suggestions.
    pub fn insert_manual(&self, mut manual: HouseManual) {
        let nested = std::mem::take(&mut manual.suggestions);
        let manual_id = manual.id.clone();
        self.manuals.insert(manual_id.clone(), manual);
        for mut suggestion in nested {
            suggestion.manual_id = manual_id.clone();
            self.store_suggestion(suggestion);
        }
    }

    /// Insert or replace one suggestion, pushing it when auto-push is on.
    pub fn insert_suggestion(&self, suggestion: Suggestion) {
        let stored = self.store_suggestion(suggestion);
        self.auto_push_suggestion(stored);
    }

    pub fn manual(&self, id: &ManualId) -> Option<HouseManual> {
        self.manuals.get(id).map(|m| self.with_nested(m.value().clone()))
    }

    pub fn suggestion(&self, id: &SuggestionId) -> Option<Suggestion> {
        self.suggestions.get(id).map(|s| s.record.clone())
    }

    /// Snapshot of the whole store, manuals ordered by creation time.
    pub fn export(&self) -> StoreFixture {
        let mut manuals: Vec<HouseManual> = self
            .manuals
            .iter()
            .map(|m| self.with_nested(m.value().clone()))
            .collect();
        manuals.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        StoreFixture { manuals }
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Logged calls of one operation, in order.
    pub fn calls_of(&self, op: StoreOp) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.op == op)
            .map(|c| c.target)
            .collect()
    }

    // ── Failure injection ────────────────────────────────────────────

    /// Make every call of `op` fail with `error`.
    pub fn fail(&self, op: StoreOp, error: StoreError) {
        self.failures.insert((op, None), error);
    }

    /// Make calls of `op` targeting suggestion `id` fail with `error`.
    pub fn fail_for(&self, op: StoreOp, id: impl Into<SuggestionId>, error: StoreError) {
        self.failures.insert((op, Some(id.into())), error);
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    // ── Explicit pushes ──────────────────────────────────────────────

    /// Deliver `suggestion` to subscribers as-is, without storing it.
    pub fn push_suggestion(&self, suggestion: Suggestion) {
        debug!(suggestion_id = %suggestion.id, "pushing suggestion");
        // No subscribers is not an error.
        let _ = self.suggestion_tx.send(suggestion);
    }

    /// Deliver the stored record for `id`, returning it.
    pub fn push_stored(&self, id: &SuggestionId) -> Option<Suggestion> {
        let record = self.suggestion(id)?;
        self.push_suggestion(record.clone());
        Some(record)
    }

    /// Deliver `manual` to subscribers as-is, without storing it.
    pub fn push_manual(&self, manual: HouseManual) {
        debug!(manual_id = %manual.id, stage = %manual.progress_stage, "pushing manual");
        let _ = self.manual_tx.send(manual);
    }

    // ── Internals ────────────────────────────────────────────────────

    fn store_suggestion(&self, suggestion: Suggestion) -> Suggestion {
        let seq = match self.suggestions.get(&suggestion.id) {
            Some(existing) => existing.seq,
            None => self.next_seq.fetch_add(1, Ordering::SeqCst),
        };
        self.suggestions.insert(
            suggestion.id.clone(),
            StoredSuggestion {
                seq,
                record: suggestion.clone(),
            },
        );
        suggestion
    }

    /// Suggestions of one manual, oldest first.
    fn suggestions_of(&self, manual_id: &ManualId) -> Vec<Suggestion> {
        let mut rows: Vec<(u64, Suggestion)> = self
            .suggestions
            .iter()
            .filter(|s| &s.record.manual_id == manual_id)
            .map(|s| (s.seq, s.record.clone()))
            .collect();
        rows.sort_by(|(seq_a, a), (seq_b, b)| {
            a.created_at.cmp(&b.created_at).then(seq_a.cmp(seq_b))
        });
        rows.into_iter().map(|(_, s)| s).collect()
    }

    fn with_nested(&self, mut manual: HouseManual) -> HouseManual {
        manual.suggestions = self.suggestions_of(&manual.id);
        manual
    }

    async fn begin_call(
        &self,
        op: StoreOp,
        target: &str,
        suggestion: Option<&SuggestionId>,
    ) -> Result<(), StoreError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StoreCall::new(op, target));

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        let injected = suggestion
            .and_then(|id| self.failures.get(&(op, Some(id.clone()))))
            .or_else(|| self.failures.get(&(op, None)))
            .map(|e| e.value().clone());
        match injected {
            Some(err) => {
                debug!(%op, target, error = %err, "injected store failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Record a decision. Only a pending suggestion can be decided.
    fn update_suggestion(
        &self,
        id: &SuggestionId,
        apply: impl FnOnce(&mut Suggestion),
    ) -> Result<Suggestion, StoreError> {
        let updated = {
            let mut entry = self
                .suggestions
                .get_mut(id)
                .ok_or_else(|| StoreError::not_found("suggestion", id))?;
            if entry.record.decision != Decision::Pending {
                return Err(StoreError::Rejected {
                    message: format!("suggestion {id} is already {}", entry.record.decision),
                });
            }
            apply(&mut entry.record);
            entry.record.being_processed = false;
            entry.record.modified_at = Some(Utc::now());
            entry.record.clone()
        };
        self.auto_push_suggestion(updated.clone());
        Ok(updated)
    }

    fn auto_push_suggestion(&self, suggestion: Suggestion) {
        if self.auto_push.load(Ordering::SeqCst) {
            self.push_suggestion(suggestion);
        }
    }

    /// Most recent manual other than `current` for the same host and listing.
    fn previous_manual(
        &self,
        current: &ManualId,
        host_id: &HostId,
        listing_id: &ListingId,
    ) -> Option<ManualId> {
        self.manuals
            .iter()
            .filter(|m| {
                m.key() != current && &m.value().host_id == host_id && &m.value().listing_id == listing_id
            })
            .max_by(|a, b| {
                a.value()
                    .created_at
                    .cmp(&b.value().created_at)
                    .then_with(|| a.key().cmp(b.key()))
            })
            .map(|m| m.key().clone())
    }
}

#[async_trait]
impl SuggestionStore for MemoryStore {
    async fn fetch_manual(&self, manual_id: &ManualId) -> Result<HouseManual, StoreError> {
        self.begin_call(StoreOp::FetchManual, manual_id.as_str(), None)
            .await?;
        self.manual(manual_id)
            .ok_or_else(|| StoreError::not_found("house manual", manual_id))
    }

    async fn fetch_pending(&self, manual_id: &ManualId) -> Result<Vec<Suggestion>, StoreError> {
        self.begin_call(StoreOp::FetchPending, manual_id.as_str(), None)
            .await?;
        if !self.manuals.contains_key(manual_id) {
            return Err(StoreError::not_found("house manual", manual_id));
        }
        Ok(self
            .suggestions_of(manual_id)
            .into_iter()
            .filter(|s| !s.being_processed && s.decision != Decision::Ignored)
            .collect())
    }

    async fn accept(&self, id: &SuggestionId) -> Result<Suggestion, StoreError> {
        self.begin_call(StoreOp::Accept, id.as_str(), Some(id))
            .await?;
        self.update_suggestion(id, |s| s.decision = Decision::Accepted)
    }

    async fn ignore(&self, id: &SuggestionId) -> Result<Suggestion, StoreError> {
        self.begin_call(StoreOp::Ignore, id.as_str(), Some(id))
            .await?;
        self.update_suggestion(id, |s| s.decision = Decision::Ignored)
    }

    async fn combine(&self, id: &SuggestionId, merged: &str) -> Result<Suggestion, StoreError> {
        self.begin_call(StoreOp::Combine, id.as_str(), Some(id))
            .await?;
        self.update_suggestion(id, |s| {
            s.decision = Decision::Combined;
            merged.clone_into(&mut s.content);
        })
    }

    async fn reuse_previous(
        &self,
        manual_id: &ManualId,
        host_id: &HostId,
        listing_id: &ListingId,
    ) -> Result<Vec<Suggestion>, StoreError> {
        self.begin_call(StoreOp::ReusePrevious, manual_id.as_str(), None)
            .await?;
        if !self.manuals.contains_key(manual_id) {
            return Err(StoreError::not_found("house manual", manual_id));
        }
        let previous = self
            .previous_manual(manual_id, host_id, listing_id)
            .ok_or_else(|| StoreError::not_found("previous house manual", host_id))?;

        let existing: HashSet<String> = self
            .suggestions_of(manual_id)
            .into_iter()
            .map(|s| s.content)
            .collect();
        let now = Utc::now();
        let copies: Vec<Suggestion> = self
            .suggestions_of(&previous)
            .into_iter()
            .filter(|s| s.decision == Decision::Pending && !existing.contains(&s.content))
            .map(|source| Suggestion {
                id: SuggestionId::from(Uuid::new_v4().to_string()),
                being_processed: false,
                decision: Decision::Pending,
                manual_id: manual_id.clone(),
                created_at: Some(now),
                modified_at: Some(now),
                ..source
            })
            .collect();

        debug!(
            manual_id = %manual_id,
            source = %previous,
            copied = copies.len(),
            "reused previous suggestions"
        );
        for copy in copies {
            self.insert_suggestion(copy);
        }
        Ok(self.suggestions_of(manual_id))
    }

    async fn update_progress_stage(
        &self,
        manual_id: &ManualId,
        stage: ProgressStage,
    ) -> Result<(), StoreError> {
        self.begin_call(StoreOp::UpdateProgressStage, manual_id.as_str(), None)
            .await?;
        {
            let mut manual = self
                .manuals
                .get_mut(manual_id)
                .ok_or_else(|| StoreError::not_found("house manual", manual_id))?;
            manual.progress_stage = stage;
            manual.modified_at = Some(Utc::now());
        }
        if self.auto_push.load(Ordering::SeqCst) {
            if let Some(manual) = self.manual(manual_id) {
                self.push_manual(manual);
            }
        }
        Ok(())
    }

    async fn subscribe_suggestions(
        &self,
        manual_id: &ManualId,
    ) -> Result<Subscription<Suggestion>, StoreError> {
        self.begin_call(StoreOp::SubscribeSuggestions, manual_id.as_str(), None)
            .await?;
        let scope = manual_id.clone();
        let stream = BroadcastStream::new(self.suggestion_tx.subscribe()).filter_map(
            move |item| match item {
                Ok(suggestion) if suggestion.manual_id == scope => Some(suggestion),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(manual_id = %scope, skipped, "suggestion subscriber lagged");
                    None
                }
            },
        );
        Ok(Subscription::new(stream))
    }

    async fn subscribe_manual(
        &self,
        manual_id: &ManualId,
    ) -> Result<Subscription<HouseManual>, StoreError> {
        self.begin_call(StoreOp::SubscribeManual, manual_id.as_str(), None)
            .await?;
        let scope = manual_id.clone();
        let stream =
            BroadcastStream::new(self.manual_tx.subscribe()).filter_map(move |item| match item {
                Ok(manual) if manual.id == scope => Some(manual),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(manual_id = %scope, skipped, "manual subscriber lagged");
                    None
                }
            });
        Ok(Subscription::new(stream))
    }
}
