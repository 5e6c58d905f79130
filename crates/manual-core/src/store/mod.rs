// ── Backing store port ──
//
// The review engine never talks to a database directly. Everything it needs
// from the record store that owns manuals and suggestions goes through
// `SuggestionStore`; `MemoryStore` is the in-process implementation.

mod memory;

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::StoreError;
use crate::model::{HostId, HouseManual, ListingId, ManualId, ProgressStage, Suggestion, SuggestionId};

pub use memory::{MemoryStore, StoreCall, StoreFixture, StoreOp};

/// Query, command and push surface of the backing store.
///
/// Writes return the confirmed record. Push subscriptions deliver every
/// change to records scoped to one manual, at least once, in order per id.
#[async_trait]
pub trait SuggestionStore: Send + Sync {
    /// The manual with its full nested suggestion collection.
    async fn fetch_manual(&self, manual_id: &ManualId) -> Result<HouseManual, StoreError>;

    /// Suggestions of a manual that are not ignored and not in flight,
    /// oldest first.
    async fn fetch_pending(&self, manual_id: &ManualId) -> Result<Vec<Suggestion>, StoreError>;

    async fn accept(&self, id: &SuggestionId) -> Result<Suggestion, StoreError>;

    async fn ignore(&self, id: &SuggestionId) -> Result<Suggestion, StoreError>;

    /// Replace the suggestion's content with `merged` and mark it combined.
    async fn combine(&self, id: &SuggestionId, merged: &str) -> Result<Suggestion, StoreError>;

    /// Copy suggestions from an earlier manual of the same host and listing
    /// into `manual_id`, returning the manual's new suggestion collection.
    async fn reuse_previous(
        &self,
        manual_id: &ManualId,
        host_id: &HostId,
        listing_id: &ListingId,
    ) -> Result<Vec<Suggestion>, StoreError>;

    async fn update_progress_stage(
        &self,
        manual_id: &ManualId,
        stage: ProgressStage,
    ) -> Result<(), StoreError>;

    /// Push updates for suggestions belonging to `manual_id`.
    async fn subscribe_suggestions(
        &self,
        manual_id: &ManualId,
    ) -> Result<Subscription<Suggestion>, StoreError>;

    /// Push updates for the manual record itself (stage changes and the like).
    async fn subscribe_manual(
        &self,
        manual_id: &ManualId,
    ) -> Result<Subscription<HouseManual>, StoreError>;
}

/// A live push subscription. Dropping it unsubscribes.
pub struct Subscription<T> {
    inner: Pin<Box<dyn Stream<Item = T> + Send>>,
}

impl<T> Subscription<T> {
    pub fn new(stream: impl Stream<Item = T> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
