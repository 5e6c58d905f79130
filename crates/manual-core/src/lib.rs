//! Review engine for AI-generated house manual suggestions.
//!
//! This crate owns the decision logic, domain model, and session plumbing
//! that sit between a backing record store and a presentation layer
//! (the `manual-review` CLI, or any other host):
//!
//! - **[`SessionController`]**: Lifecycle facade for one review session at
//!   a time: [`open()`](SessionController::open) subscribes to push updates
//!   and loads a manual, decision operations (accept, ignore, combine,
//!   accept-all, reuse-previous) run optimistically against the store, and
//!   [`close()`](SessionController::close) tears everything down.
//!
//! - **[`reduce`]**: The pure decision engine. Every change to a session's
//!   [`SessionState`] is an [`Action`] applied by this one function, on a
//!   single session loop task.
//!
//! - **[`SessionView`]**: Derived, read-only projection of the state:
//!   pending list, current suggestion, processing and empty flags.
//!
//! - **[`StateStream`]**: Subscription handle vended by the controller.
//!   Exposes `current()` / `latest()` / `changed()` for reactive rendering.
//!
//! - **[`SuggestionStore`]**: Port to the backing store, with
//!   [`MemoryStore`] as the in-process implementation.

pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{FailurePolicy, SessionConfig};
pub use controller::{AcceptAllReport, AcceptFailure, SessionController};
pub use error::{CoreError, StoreError};
pub use session::{Action, DecisionCounts, SessionState, SessionView, reduce};
pub use store::{MemoryStore, StoreCall, StoreFixture, StoreOp, Subscription, SuggestionStore};
pub use stream::StateStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Decision, FieldDisplay, HostId, HouseManual, ListingId, ManualId, ProgressStage,
    SourceChannel, SourceFlags, Suggestion, SuggestionId, TranscriptSource,
};
