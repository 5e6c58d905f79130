// ── Reactive session state streams ──
//
// Subscription handle for consuming session state changes from a
// `SessionController`.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::session::{SessionState, SessionView};

/// A subscription to the state of one controller.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via the `changed()` method or by converting to a `Stream`.
pub struct StateStream {
    current: Arc<SessionState>,
    receiver: watch::Receiver<Arc<SessionState>>,
}

impl StateStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<SessionState>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation time or at the last `changed()`.
    pub fn current(&self) -> &Arc<SessionState> {
        &self.current
    }

    /// Get the latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Arc<SessionState> {
        self.receiver.borrow().clone()
    }

    /// Project the latest snapshot.
    pub fn view(&self) -> SessionView {
        SessionView::project(&self.receiver.borrow())
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` once the controller has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<SessionState>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Wait until `predicate` holds for the latest state, returning it.
    /// Returns `None` if the controller is dropped first.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&SessionState) -> bool,
    ) -> Option<Arc<SessionState>> {
        let snap = self
            .receiver
            .wait_for(|state| predicate(&**state))
            .await
            .ok()?
            .clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> StateWatchStream {
        StateWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields the state once on first poll, then again after every applied action.
pub struct StateWatchStream {
    inner: WatchStream<Arc<SessionState>>,
}

impl Stream for StateWatchStream {
    type Item = Arc<SessionState>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
