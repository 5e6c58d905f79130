// ── Derived view projection ──
//
// Read-only values computed from `SessionState` on every change. Nothing
// here is ever written back into the state.

use serde::Serialize;

use crate::model::{Decision, ManualId, ProgressStage, Suggestion};

use super::state::SessionState;

/// Suggestions awaiting a decision with no operation in flight, in
/// collection order.
pub(crate) fn pending_suggestions(
    suggestions: &[Suggestion],
) -> impl Iterator<Item = &Suggestion> + '_ {
    suggestions.iter().filter(|s| s.is_pending())
}

/// Tally of the suggestion collection by decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecisionCounts {
    pub pending: usize,
    /// Pending decision with an operation in flight.
    pub in_flight: usize,
    pub accepted: usize,
    pub ignored: usize,
    pub combined: usize,
}

impl DecisionCounts {
    fn tally(suggestions: &[Suggestion]) -> Self {
        suggestions.iter().fold(Self::default(), |mut counts, s| {
            match s.decision {
                Decision::Pending if s.being_processed => counts.in_flight += 1,
                Decision::Pending => counts.pending += 1,
                Decision::Accepted => counts.accepted += 1,
                Decision::Ignored => counts.ignored += 1,
                Decision::Combined => counts.combined += 1,
            }
            counts
        })
    }

    pub fn total(&self) -> usize {
        self.pending + self.in_flight + self.accepted + self.ignored + self.combined
    }
}

/// Snapshot of everything a presentation layer needs from a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub is_open: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub manual_id: Option<ManualId>,
    pub stage: Option<ProgressStage>,
    pub pending: Vec<Suggestion>,
    /// Suggestion under the cursor for single-suggestion review.
    pub current: Option<Suggestion>,
    pub cursor: usize,
    pub has_more: bool,
    pub has_previous: bool,
    /// The manual is still producing suggestions.
    pub is_processing: bool,
    /// Nothing left to review and nothing on the way.
    pub is_empty: bool,
    /// Only populated while the transcript is toggled visible.
    pub transcript: Option<String>,
    pub decision_started: bool,
    pub draft: String,
    pub counts: DecisionCounts,
}

impl SessionView {
    pub fn project(state: &SessionState) -> Self {
        let pending: Vec<Suggestion> = pending_suggestions(&state.suggestions).cloned().collect();
        let stage = state.manual.as_ref().map(|m| m.progress_stage);
        let is_processing = stage.is_some_and(ProgressStage::is_processing);
        let current = pending.get(state.cursor).cloned();
        let transcript = state
            .show_transcript
            .then(|| state.manual.as_ref().and_then(|m| m.transcript.clone()))
            .flatten();

        Self {
            is_open: state.is_open,
            loading: state.loading,
            error: state.error.clone(),
            manual_id: state.manual_id.clone(),
            stage,
            current,
            cursor: state.cursor,
            has_more: state.cursor + 1 < pending.len(),
            has_previous: state.cursor > 0,
            is_processing,
            is_empty: pending.is_empty() && !is_processing,
            transcript,
            decision_started: state.decision_started,
            draft: state.draft.clone(),
            counts: DecisionCounts::tally(&state.suggestions),
            pending,
        }
    }
}

impl From<&SessionState> for SessionView {
    fn from(state: &SessionState) -> Self {
        Self::project(state)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::HouseManual;
    use crate::session::{Action, reduce};

    fn session(stage: ProgressStage, ids: &[&str]) -> SessionState {
        let mut manual = HouseManual::new("hm-1", "host-1", "lst-1")
            .with_stage(stage)
            .with_suggestions(
                ids.iter()
                    .map(|id| Suggestion::new(*id, "hm-1", format!("content {id}")))
                    .collect(),
            );
        manual.transcript = Some("Host: the wifi password is on the fridge.".into());
        let state = reduce(
            SessionState::default(),
            Action::Open {
                manual_id: "hm-1".into(),
            },
        );
        reduce(state, Action::SetManual(manual))
    }

    #[test]
    fn initial_state_projects_empty_view() {
        let view = SessionView::project(&SessionState::default());
        assert!(view.pending.is_empty());
        assert!(view.is_empty);
        assert!(!view.is_processing);
        assert_eq!(view.current, None);
        assert!(!view.has_more);
        assert!(!view.has_previous);
        assert_eq!(view.stage, None);
    }

    #[test]
    fn processing_stages_are_never_empty() {
        for stage in [
            ProgressStage::Transcribing,
            ProgressStage::Analyzing,
            ProgressStage::Generating,
        ] {
            let view = SessionView::project(&session(stage, &[]));
            assert!(view.is_processing, "{stage}");
            assert!(!view.is_empty, "{stage}");
        }

        let ready = SessionView::project(&session(ProgressStage::Ready, &[]));
        assert!(!ready.is_processing);
        assert!(ready.is_empty);
    }

    #[test]
    fn cursor_navigation_flags() {
        let state = session(ProgressStage::Ready, &["a", "b", "c"]);
        let view = SessionView::project(&state);
        assert_eq!(view.current.as_ref().unwrap().id.as_str(), "a");
        assert!(view.has_more);
        assert!(!view.has_previous);

        let state = reduce(state, Action::SetCursor(2));
        let view = SessionView::project(&state);
        assert_eq!(view.current.as_ref().unwrap().id.as_str(), "c");
        assert!(!view.has_more);
        assert!(view.has_previous);
    }

    #[test]
    fn transcript_only_when_toggled() {
        let state = session(ProgressStage::Ready, &["a"]);
        assert_eq!(SessionView::project(&state).transcript, None);

        let state = reduce(state, Action::ToggleTranscript);
        assert_eq!(
            SessionView::project(&state).transcript.as_deref(),
            Some("Host: the wifi password is on the fridge.")
        );
    }

    #[test]
    fn counts_split_in_flight_from_pending() {
        let state = session(ProgressStage::Ready, &["a", "b", "c", "d"]);
        let state = reduce(state, Action::BeginOp("a".into()));
        let mut ignored = state.suggestions[1].clone();
        ignored.decision = Decision::Ignored;
        let mut combined = state.suggestions[2].clone();
        combined.decision = Decision::Combined;
        let state = reduce(state, Action::UpsertSuggestion(ignored));
        let state = reduce(state, Action::UpsertSuggestion(combined));

        let view = SessionView::project(&state);
        assert_eq!(
            view.counts,
            DecisionCounts {
                pending: 1,
                in_flight: 1,
                accepted: 0,
                ignored: 1,
                combined: 1,
            }
        );
        assert_eq!(view.counts.total(), 4);
        assert_eq!(view.pending.len(), view.counts.pending);

        insta::assert_json_snapshot!(view.counts, @r#"
        {
          "pending": 1,
          "in_flight": 1,
          "accepted": 0,
          "ignored": 1,
          "combined": 1
        }
        "#);
    }
}
