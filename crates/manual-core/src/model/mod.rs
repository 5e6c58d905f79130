// ── Domain model ──
//
// Canonical representations of the records the backing store owns. Field
// names on the wire follow the store's record shape; Rust names follow
// what the review engine calls them.

pub mod ids;
pub mod manual;
pub mod suggestion;

// ── Re-exports ──────────────────────────────────────────────────────

pub use ids::{HostId, ListingId, ManualId, SuggestionId};
pub use manual::{HouseManual, ProgressStage, TranscriptSource};
pub use suggestion::{Decision, FieldDisplay, SourceChannel, SourceFlags, Suggestion};
