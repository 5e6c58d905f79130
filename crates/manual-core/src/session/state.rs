// ── Canonical session state and its transition function ──

use crate::model::{HouseManual, ManualId, Suggestion, SuggestionId};

use super::action::Action;
use super::view::pending_suggestions;

/// Everything a review session stores. Derived flags (pending list,
/// processing, empty) are never stored here; see [`SessionView`](super::SessionView).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub is_open: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub manual_id: Option<ManualId>,
    /// Last loaded manual. Its `suggestions` field is always empty: the
    /// collection lives in `suggestions` so there is a single copy.
    pub manual: Option<HouseManual>,
    pub suggestions: Vec<Suggestion>,
    /// Index into the pending list for single-suggestion review.
    pub cursor: usize,
    pub show_transcript: bool,
    /// Set once the host has issued a first decision in this session.
    pub decision_started: bool,
    /// Merge text being edited for a combine.
    pub draft: String,
}

impl SessionState {
    pub fn suggestion(&self, id: &SuggestionId) -> Option<&Suggestion> {
        self.suggestions.iter().find(|s| &s.id == id)
    }

    fn suggestion_mut(&mut self, id: &SuggestionId) -> Option<&mut Suggestion> {
        self.suggestions.iter_mut().find(|s| &s.id == id)
    }

    pub fn pending(&self) -> Vec<&Suggestion> {
        pending_suggestions(&self.suggestions).collect()
    }

    fn clamp_cursor(&self, index: usize) -> usize {
        let len = pending_suggestions(&self.suggestions).count();
        index.min(len.saturating_sub(1))
    }
}

/// Pure transition function: no side effects, no async work.
///
/// The same `(state, action)` pair always produces the same result.
pub fn reduce(mut state: SessionState, action: Action) -> SessionState {
    match action {
        Action::Open { manual_id } => {
            state.is_open = true;
            state.loading = true;
            state.error = None;
            state.manual_id = Some(manual_id);
        }
        Action::Close => return SessionState::default(),
        Action::SetLoading(loading) => state.loading = loading,
        Action::SetError(message) => {
            state.error = Some(message);
            state.loading = false;
        }
        Action::ClearError => state.error = None,
        Action::SetManual(mut manual) => {
            state.suggestions = std::mem::take(&mut manual.suggestions);
            state.manual = Some(manual);
            state.loading = false;
        }
        Action::SetSuggestions(suggestions) => state.suggestions = suggestions,
        Action::UpsertSuggestion(incoming) => match state.suggestion_mut(&incoming.id) {
            Some(existing) => *existing = incoming,
            None => state.suggestions.push(incoming),
        },
        Action::BeginOp(id) => {
            if let Some(suggestion) = state.suggestion_mut(&id) {
                suggestion.being_processed = true;
                state.decision_started = true;
            }
        }
        Action::BeginOpAll => {
            for suggestion in state.suggestions.iter_mut().filter(|s| s.is_pending()) {
                suggestion.being_processed = true;
            }
            state.decision_started = true;
        }
        Action::EndOp(id) => {
            if let Some(suggestion) = state.suggestion_mut(&id) {
                suggestion.being_processed = false;
            }
        }
        Action::SetCursor(index) => state.cursor = state.clamp_cursor(index),
        Action::Next => state.cursor = state.clamp_cursor(state.cursor.saturating_add(1)),
        Action::Prev => state.cursor = state.clamp_cursor(state.cursor.saturating_sub(1)),
        Action::ToggleTranscript => state.show_transcript = !state.show_transcript,
        Action::SetDraft(text) => state.draft = text,
    }
    state
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Decision, ProgressStage};

    fn manual_with(ids: &[&str]) -> HouseManual {
        HouseManual::new("hm-1", "host-1", "lst-1")
            .with_stage(ProgressStage::Ready)
            .with_suggestions(
                ids.iter()
                    .map(|id| Suggestion::new(*id, "hm-1", format!("content {id}")))
                    .collect(),
            )
    }

    fn loaded(ids: &[&str]) -> SessionState {
        let state = reduce(
            SessionState::default(),
            Action::Open {
                manual_id: "hm-1".into(),
            },
        );
        reduce(state, Action::SetManual(manual_with(ids)))
    }

    fn pending_ids(state: &SessionState) -> Vec<String> {
        state.pending().iter().map(|s| s.id.to_string()).collect()
    }

    #[test]
    fn open_sets_loading_and_clears_error() {
        let state = SessionState {
            error: Some("old".into()),
            ..SessionState::default()
        };
        let state = reduce(
            state,
            Action::Open {
                manual_id: "hm-1".into(),
            },
        );
        assert!(state.is_open);
        assert!(state.loading);
        assert_eq!(state.error, None);
        assert_eq!(state.manual_id, Some(ManualId::from("hm-1")));
    }

    #[test]
    fn set_manual_moves_suggestions_out_of_manual() {
        let state = loaded(&["a", "b"]);
        assert!(!state.loading);
        assert_eq!(state.suggestions.len(), 2);
        assert!(state.manual.as_ref().unwrap().suggestions.is_empty());
    }

    #[test]
    fn set_error_stops_loading() {
        let state = reduce(
            SessionState {
                loading: true,
                ..SessionState::default()
            },
            Action::SetError("boom".into()),
        );
        assert_eq!(state.error.as_deref(), Some("boom"));
        assert!(!state.loading);
        assert_eq!(reduce(state, Action::ClearError).error, None);
    }

    #[test]
    fn close_resets_to_initial_state() {
        let mut state = loaded(&["a", "b", "c"]);
        state = reduce(state, Action::BeginOp("a".into()));
        state = reduce(state, Action::ToggleTranscript);
        state = reduce(state, Action::Next);
        state = reduce(state, Action::SetError("x".into()));
        assert_eq!(reduce(state, Action::Close), SessionState::default());
    }

    #[test]
    fn begin_op_is_idempotent() {
        let once = reduce(loaded(&["a", "b"]), Action::BeginOp("a".into()));
        let twice = reduce(once.clone(), Action::BeginOp("a".into()));
        assert_eq!(once, twice);
        assert_eq!(pending_ids(&once), vec!["b"]);
    }

    #[test]
    fn begin_op_touches_only_its_suggestion() {
        let state = reduce(loaded(&["a", "b", "c"]), Action::BeginOp("b".into()));
        let flags: Vec<bool> = state.suggestions.iter().map(|s| s.being_processed).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert!(state.decision_started);
    }

    #[test]
    fn begin_op_for_unknown_id_is_a_no_op() {
        let before = loaded(&["a"]);
        let after = reduce(before.clone(), Action::BeginOp("zzz".into()));
        assert_eq!(before, after);
    }

    #[test]
    fn begin_op_all_marks_only_pending() {
        let mut state = loaded(&["a", "b", "c"]);
        let mut ignored = state.suggestions[1].clone();
        ignored.decision = Decision::Ignored;
        state = reduce(state, Action::UpsertSuggestion(ignored));
        state = reduce(state, Action::BeginOpAll);

        assert!(state.pending().is_empty());
        assert!(state.suggestions[0].being_processed);
        assert!(!state.suggestions[1].being_processed);
        assert!(state.suggestions[2].being_processed);
    }

    #[test]
    fn upsert_inserts_unknown_and_replaces_known() {
        let state = loaded(&["a"]);
        let state = reduce(
            state,
            Action::UpsertSuggestion(Suggestion::new("b", "hm-1", "new")),
        );
        assert_eq!(pending_ids(&state), vec!["a", "b"]);

        let mut replacement = Suggestion::new("a", "hm-1", "replaced");
        replacement.slug = "other".into();
        let state = reduce(state, Action::UpsertSuggestion(replacement.clone()));
        assert_eq!(state.suggestion(&"a".into()), Some(&replacement));
        assert_eq!(state.suggestions.len(), 2);
    }

    #[test]
    fn upsert_of_identical_record_keeps_pending_count() {
        let state = loaded(&["a", "b"]);
        let same = state.suggestions[0].clone();
        let after = reduce(state.clone(), Action::UpsertSuggestion(same));
        assert_eq!(after.pending().len(), state.pending().len());
        assert_eq!(after, state);
    }

    #[test]
    fn push_update_wins_over_inflight_flag() {
        let state = reduce(loaded(&["a"]), Action::BeginOp("a".into()));
        let mut confirmed = Suggestion::new("a", "hm-1", "content a");
        confirmed.decision = Decision::Accepted;
        let state = reduce(state, Action::UpsertSuggestion(confirmed));
        assert!(!state.suggestions[0].being_processed);
        assert_eq!(state.suggestions[0].decision, Decision::Accepted);
    }

    #[test]
    fn end_op_clears_flag() {
        let state = reduce(loaded(&["a"]), Action::BeginOp("a".into()));
        let state = reduce(state, Action::EndOp("a".into()));
        assert_eq!(pending_ids(&state), vec!["a"]);
    }

    #[test]
    fn cursor_is_clamped_to_pending_range() {
        let mut state = loaded(&["a", "b", "c"]);
        state = reduce(state, Action::SetCursor(10));
        assert_eq!(state.cursor, 2);
        state = reduce(state, Action::Next);
        assert_eq!(state.cursor, 2);
        state = reduce(state, Action::Prev);
        state = reduce(state, Action::Prev);
        state = reduce(state, Action::Prev);
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn cursor_stays_at_zero_without_pending() {
        let state = reduce(SessionState::default(), Action::Next);
        assert_eq!(state.cursor, 0);
        let state = reduce(state, Action::SetCursor(3));
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn toggle_transcript_and_draft() {
        let state = reduce(SessionState::default(), Action::ToggleTranscript);
        assert!(state.show_transcript);
        let state = reduce(state, Action::ToggleTranscript);
        assert!(!state.show_transcript);
        let state = reduce(state, Action::SetDraft("merged".into()));
        assert_eq!(state.draft, "merged");
    }

    #[test]
    fn set_suggestions_replaces_wholesale() {
        let state = reduce(loaded(&["a", "b"]), Action::BeginOp("a".into()));
        let state = reduce(
            state,
            Action::SetSuggestions(vec![Suggestion::new("z", "hm-1", "reused")]),
        );
        assert_eq!(pending_ids(&state), vec!["z"]);
        assert_eq!(state.suggestions.len(), 1);
    }

    /// Pending never drifts from the pure filter, whatever the action order.
    #[test]
    fn pending_matches_filter_across_action_sequences() {
        let mut accepted = Suggestion::new("c", "hm-1", "content c");
        accepted.decision = Decision::Accepted;
        let actions = vec![
            Action::BeginOp("a".into()),
            Action::UpsertSuggestion(Suggestion::new("d", "hm-1", "late")),
            Action::UpsertSuggestion(accepted),
            Action::Next,
            Action::BeginOpAll,
            Action::EndOp("b".into()),
            Action::SetSuggestions(vec![Suggestion::new("e", "hm-1", "e")]),
            Action::BeginOp("e".into()),
            Action::Close,
        ];

        let mut state = loaded(&["a", "b", "c"]);
        for action in actions {
            state = reduce(state, action);
            let expected: Vec<&Suggestion> = state
                .suggestions
                .iter()
                .filter(|s| s.decision == Decision::Pending && !s.being_processed)
                .collect();
            assert_eq!(state.pending(), expected);
        }
    }
}
