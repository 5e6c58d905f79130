//! Every transition the session state can go through.
//!
//! Local user intents, store completions and push updates from the backing
//! store all arrive as one of these, and all of them pass through
//! [`reduce`](super::reduce).

use crate::model::{HouseManual, ManualId, Suggestion, SuggestionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A session for `manual_id` starts loading.
    Open { manual_id: ManualId },
    /// Reset to the empty initial state.
    Close,
    SetLoading(bool),
    /// Record a user-visible error; clears `loading`.
    SetError(String),
    ClearError,
    /// Replace the loaded manual and, wholesale, its suggestion collection.
    SetManual(HouseManual),
    /// Replace the suggestion collection wholesale.
    SetSuggestions(Vec<Suggestion>),
    /// Replace the suggestion with the same id, or append it if unknown.
    UpsertSuggestion(Suggestion),
    /// Optimistically mark one suggestion as in flight.
    BeginOp(SuggestionId),
    /// Optimistically mark every pending suggestion as in flight.
    BeginOpAll,
    /// Clear the in-flight flag of one suggestion.
    EndOp(SuggestionId),
    SetCursor(usize),
    Next,
    Prev,
    ToggleTranscript,
    /// Edited merge text for a combine in progress.
    SetDraft(String),
}

impl Action {
    /// Short name for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::Close => "close",
            Self::SetLoading(_) => "set_loading",
            Self::SetError(_) => "set_error",
            Self::ClearError => "clear_error",
            Self::SetManual(_) => "set_manual",
            Self::SetSuggestions(_) => "set_suggestions",
            Self::UpsertSuggestion(_) => "upsert_suggestion",
            Self::BeginOp(_) => "begin_op",
            Self::BeginOpAll => "begin_op_all",
            Self::EndOp(_) => "end_op",
            Self::SetCursor(_) => "set_cursor",
            Self::Next => "next",
            Self::Prev => "prev",
            Self::ToggleTranscript => "toggle_transcript",
            Self::SetDraft(_) => "set_draft",
        }
    }
}
