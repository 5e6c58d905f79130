// ── Core error types ──
//
// `StoreError` is what a backing-store adapter reports. `CoreError` is what
// the session controller reports to its callers. Store failures during a
// decision operation never reach callers as `Err`: the controller folds
// them into the session's error message instead.

use thiserror::Error;

use crate::model::Decision;

/// Failure reported by a [`SuggestionStore`](crate::store::SuggestionStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("store unreachable: {message}")]
    Transport { message: String },

    #[error("store rejected the request: {message}")]
    Rejected { message: String },

    #[error("store call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

impl StoreError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Precondition errors ──────────────────────────────────────────
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("An operation is already in flight for suggestion {id}")]
    OperationInFlight { id: String },

    #[error("Suggestion {id} is already {decision}")]
    AlreadyDecided { id: String, decision: Decision },

    #[error("No review session is open")]
    NoSession,

    #[error("No house manual is loaded in this session")]
    NoManualLoaded,

    // ── Store errors (wrapped, not exposed raw) ──────────────────────
    #[error("Backing store error: {message}")]
    Transport { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from adapter-layer errors ─────────────────────────────

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => CoreError::NotFound { entity, id },
            StoreError::Transport { message } | StoreError::Rejected { message } => {
                CoreError::Transport { message }
            }
            StoreError::Timeout { timeout_secs } => CoreError::Transport {
                message: format!("timed out after {timeout_secs}s"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_keeps_entity_and_id() {
        let err = CoreError::from(StoreError::not_found("house manual", "hm-404"));
        assert!(matches!(
            err,
            CoreError::NotFound { entity: "house manual", ref id } if id == "hm-404"
        ));
        assert_eq!(err.to_string(), "house manual not found: hm-404");
    }

    #[test]
    fn rejected_and_timeout_become_transport() {
        let rejected = CoreError::from(StoreError::Rejected {
            message: "row locked".into(),
        });
        assert!(matches!(rejected, CoreError::Transport { .. }));

        let timeout = CoreError::from(StoreError::Timeout { timeout_secs: 5 });
        assert_eq!(timeout.to_string(), "Backing store error: timed out after 5s");
    }

    #[test]
    fn already_decided_names_the_decision() {
        let err = CoreError::AlreadyDecided {
            id: "sug-001".into(),
            decision: Decision::Accepted,
        };
        assert_eq!(err.to_string(), "Suggestion sug-001 is already accepted");
    }
}
