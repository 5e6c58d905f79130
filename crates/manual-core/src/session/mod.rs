// ── Review session decision engine ──
//
// A session is a plain value (`SessionState`) plus a pure transition
// function (`reduce`). The controller owns the only live copy and feeds it
// actions one at a time; `SessionView` is derived from it on demand.

mod action;
mod state;
mod view;

pub use action::Action;
pub use state::{SessionState, reduce};
pub use view::{DecisionCounts, SessionView};
