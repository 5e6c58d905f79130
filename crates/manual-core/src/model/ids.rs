// ── Record identity types ──
//
// Every record the backing store hands us is addressed by an opaque
// string. Wrapping them in distinct newtypes keeps a suggestion id from
// ever being passed where a house-manual id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

record_id!(
    /// Identifier of a single AI suggestion.
    SuggestionId
);

record_id!(
    /// Identifier of a house manual (the document that owns suggestions).
    ManualId
);

record_id!(
    /// Identifier of the host who owns a house manual.
    HostId
);

record_id!(
    /// Identifier of the listing a house manual describes.
    ListingId
);

impl ManualId {
    /// Parse a session entry-point identifier, rejecting blank input.
    ///
    /// Opening a session is the only inbound trigger, and it requires a
    /// non-empty manual id.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::Validation {
                message: "house manual id must not be empty".into(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn manual_id_parse_trims_whitespace() {
        let id = ManualId::parse("  hm-001 ").unwrap();
        assert_eq!(id.as_str(), "hm-001");
    }

    #[test]
    fn manual_id_parse_rejects_blank() {
        assert!(matches!(
            ManualId::parse("   "),
            Err(CoreError::Validation { .. })
        ));
        assert!(ManualId::parse("").is_err());
    }

    #[test]
    fn suggestion_id_display_and_from_str() {
        let id: SuggestionId = "sug-003".parse().unwrap();
        assert_eq!(id.to_string(), "sug-003");
        assert_eq!(id, SuggestionId::from("sug-003"));
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = HostId::from("host-9");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"host-9\"");
        let back: HostId = serde_json::from_str("\"host-9\"").unwrap();
        assert_eq!(back, id);
    }
}
