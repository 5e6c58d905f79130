// ── Suggestion domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::{ListingId, ManualId, SuggestionId};

/// Host decision on a suggestion.
///
/// Terminal once it leaves `Pending`. `Combined` is only ever reached
/// through an explicit merge with the previous content.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Decision {
    #[default]
    Pending,
    Accepted,
    Ignored,
    Combined,
}

impl Decision {
    /// Accepted or combined: the suggestion's content made it into the manual.
    pub fn is_finalized(self) -> bool {
        matches!(self, Self::Accepted | Self::Combined)
    }
}

/// Provenance channel a suggestion was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "kebab-case")]
pub enum SourceChannel {
    Call,
    Audio,
    Form,
    ExternalDoc,
    Listing,
    File,
}

/// Provenance flags as stored on the record. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFlags {
    pub from_audio: bool,
    pub from_call: bool,
    pub from_free_text_form: bool,
    pub from_google_doc: bool,
    pub from_listing: bool,
    pub from_pdf: bool,
}

impl SourceFlags {
    pub fn channels(&self) -> Vec<SourceChannel> {
        [
            (self.from_call, SourceChannel::Call),
            (self.from_audio, SourceChannel::Audio),
            (self.from_free_text_form, SourceChannel::Form),
            (self.from_google_doc, SourceChannel::ExternalDoc),
            (self.from_listing, SourceChannel::Listing),
            (self.from_pdf, SourceChannel::File),
        ]
        .into_iter()
        .filter_map(|(set, channel)| set.then_some(channel))
        .collect()
    }
}

/// Display block for the manual or listing field a suggestion targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDisplay {
    pub field_name: String,
    pub display_value: String,
    pub raw_value: String,
}

/// A single AI-proposed content change awaiting a host decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: SuggestionId,
    #[serde(default)]
    pub slug: String,

    /// True exactly while a store operation for this suggestion is in flight.
    #[serde(default)]
    pub being_processed: bool,
    #[serde(default)]
    pub decision: Decision,

    pub content: String,
    /// The value this suggestion would replace, if the field had one.
    #[serde(default)]
    pub previous_content: Option<String>,
    /// Source excerpt the model was given.
    #[serde(default)]
    pub raw_text_sent: Option<String>,

    #[serde(default)]
    pub field_suggested_house: Option<FieldDisplay>,
    #[serde(default)]
    pub field_suggested_listing: Option<FieldDisplay>,

    #[serde(default)]
    pub source_flags: SourceFlags,

    /// Owning house manual (non-owning back-reference).
    #[serde(rename = "house_manual_id")]
    pub manual_id: ManualId,
    #[serde(default)]
    pub listing_id: Option<ListingId>,
    #[serde(default)]
    pub creator_id: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Suggestion {
    /// A fresh pending suggestion with no provenance or display metadata.
    pub fn new(
        id: impl Into<SuggestionId>,
        manual_id: impl Into<ManualId>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            slug: String::new(),
            being_processed: false,
            decision: Decision::Pending,
            content: content.into(),
            previous_content: None,
            raw_text_sent: None,
            field_suggested_house: None,
            field_suggested_listing: None,
            source_flags: SourceFlags::default(),
            manual_id: manual_id.into(),
            listing_id: None,
            creator_id: None,
            created_at: None,
            modified_at: None,
        }
    }

    #[must_use]
    pub fn with_previous(mut self, previous: impl Into<String>) -> Self {
        self.previous_content = Some(previous.into());
        self
    }

    /// Awaiting a decision and not under an in-flight operation.
    pub fn is_pending(&self) -> bool {
        self.decision == Decision::Pending && !self.being_processed
    }

    pub fn is_finalized(&self) -> bool {
        self.decision.is_finalized()
    }

    /// Default merge text offered when the host starts a combine:
    /// previous content, a blank line, then the suggested content.
    pub fn combine_draft(&self) -> String {
        let previous = self.previous_content.as_deref().unwrap_or_default();
        format!("{previous}\n\n{}", self.content).trim().to_owned()
    }

    /// Human label for the targeted field, falling back to the slug.
    pub fn field_label(&self) -> &str {
        self.field_suggested_house
            .as_ref()
            .or(self.field_suggested_listing.as_ref())
            .map_or(self.slug.as_str(), |f| f.field_name.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pending_requires_no_inflight_operation() {
        let mut s = Suggestion::new("sug-1", "hm-1", "text");
        assert!(s.is_pending());
        s.being_processed = true;
        assert!(!s.is_pending());
        s.being_processed = false;
        s.decision = Decision::Ignored;
        assert!(!s.is_pending());
    }

    #[test]
    fn combine_draft_joins_previous_and_new() {
        let s = Suggestion::new("sug-1", "hm-1", "Check-in at 3 PM.").with_previous("Check-in 3.");
        assert_eq!(s.combine_draft(), "Check-in 3.\n\nCheck-in at 3 PM.");
    }

    #[test]
    fn combine_draft_without_previous_is_just_content() {
        let s = Suggestion::new("sug-1", "hm-1", "WiFi: beach-house");
        assert_eq!(s.combine_draft(), "WiFi: beach-house");
    }

    #[test]
    fn deserializes_store_record_shape() {
        let raw = serde_json::json!({
            "id": "sug-001",
            "slug": "check-in-instructions",
            "being_processed": false,
            "decision": "pending",
            "content": "Check-in time is 3:00 PM.",
            "previous_content": null,
            "source_flags": { "from_call": true },
            "house_manual_id": "hm-001",
            "created_at": "2024-01-15T10:30:00Z"
        });
        let s: Suggestion = serde_json::from_value(raw).unwrap();
        assert_eq!(s.manual_id, ManualId::from("hm-001"));
        assert_eq!(s.source_flags.channels(), vec![SourceChannel::Call]);
        assert!(s.created_at.is_some());
        assert!(s.is_pending());
    }

    #[test]
    fn decision_round_trips_through_strum() {
        assert_eq!(Decision::Combined.to_string(), "combined");
        assert_eq!("ignored".parse::<Decision>().unwrap(), Decision::Ignored);
        assert!(Decision::Accepted.is_finalized());
        assert!(!Decision::Ignored.is_finalized());
    }
}
