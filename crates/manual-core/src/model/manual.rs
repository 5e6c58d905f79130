// ── House manual domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::{HostId, ListingId, ManualId};
use super::suggestion::Suggestion;

/// Where a house manual sits in the generation pipeline.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProgressStage {
    #[default]
    Idle,
    Transcribing,
    Analyzing,
    Generating,
    Ready,
    Complete,
    Error,
}

impl ProgressStage {
    /// Suggestions are still being produced; decisions are not offered.
    pub fn is_processing(self) -> bool {
        matches!(self, Self::Transcribing | Self::Analyzing | Self::Generating)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Transcribing => "We're transcribing your call now...",
            Self::Analyzing => "We're analyzing the content...",
            Self::Generating => "Generating AI suggestions...",
            Self::Ready => "Suggestions ready for review",
            Self::Complete => "All suggestions reviewed",
            Self::Error => "An error occurred",
        }
    }
}

/// Medium the transcript was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TranscriptSource {
    Call,
    Audio,
    Document,
}

/// The house manual record: owns its suggestions and carries the
/// processing stage indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseManual {
    pub id: ManualId,
    #[serde(default)]
    pub slug: String,

    #[serde(rename = "ai_suggestions", default)]
    pub suggestions: Vec<Suggestion>,
    /// Whether suggestion generation was requested for this manual.
    #[serde(rename = "ai_suggestions_creation", default)]
    pub suggestions_creation: bool,

    #[serde(default)]
    pub progress_stage: ProgressStage,

    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub transcript_source: Option<TranscriptSource>,

    pub host_id: HostId,
    pub listing_id: ListingId,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
}

impl HouseManual {
    pub fn new(
        id: impl Into<ManualId>,
        host_id: impl Into<HostId>,
        listing_id: impl Into<ListingId>,
    ) -> Self {
        Self {
            id: id.into(),
            slug: String::new(),
            suggestions: Vec::new(),
            suggestions_creation: false,
            progress_stage: ProgressStage::Idle,
            transcript: None,
            transcript_source: None,
            host_id: host_id.into(),
            listing_id: listing_id.into(),
            created_at: None,
            modified_at: None,
        }
    }

    #[must_use]
    pub fn with_stage(mut self, stage: ProgressStage) -> Self {
        self.progress_stage = stage;
        self
    }

    #[must_use]
    pub fn with_suggestions(mut self, suggestions: Vec<Suggestion>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn is_processing(&self) -> bool {
        self.progress_stage.is_processing()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn processing_stages() {
        let processing: Vec<_> = [
            ProgressStage::Idle,
            ProgressStage::Transcribing,
            ProgressStage::Analyzing,
            ProgressStage::Generating,
            ProgressStage::Ready,
            ProgressStage::Complete,
            ProgressStage::Error,
        ]
        .into_iter()
        .filter(|s| s.is_processing())
        .collect();
        assert_eq!(
            processing,
            vec![
                ProgressStage::Transcribing,
                ProgressStage::Analyzing,
                ProgressStage::Generating
            ]
        );
    }

    #[test]
    fn manual_record_without_suggestions_defaults_to_empty() {
        let raw = serde_json::json!({
            "id": "hm-001",
            "progress_stage": "analyzing",
            "host_id": "user-001",
            "listing_id": "lst-001"
        });
        let manual: HouseManual = serde_json::from_value(raw).unwrap();
        assert!(manual.suggestions.is_empty());
        assert!(manual.is_processing());
        assert_eq!(manual.transcript, None);
    }

    #[test]
    fn stage_parses_from_lowercase() {
        assert_eq!(
            "generating".parse::<ProgressStage>().unwrap(),
            ProgressStage::Generating
        );
        assert_eq!(ProgressStage::Ready.to_string(), "ready");
    }
}
