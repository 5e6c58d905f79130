// ── Runtime session configuration ──
//
// Tuning for a review session. Never touches disk: the CLI (or any other
// host) builds a `SessionConfig` and hands it in.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What happens to a suggestion's in-flight flag when its store call fails.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FailurePolicy {
    /// Leave `being_processed` set until a push update corrects it.
    #[default]
    LeaveStuck,
    /// Clear `being_processed` so the suggestion is pending again.
    Rollback,
}

/// Configuration for one [`SessionController`](crate::SessionController).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Upper bound on any single backing-store call.
    pub request_timeout: Duration,
    /// Capacity of the session loop's action channel.
    pub action_buffer: usize,
    /// Capacity of the "suggestions accepted" broadcast.
    pub notify_buffer: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            action_buffer: 64,
            notify_buffer: 16,
            failure_policy: FailurePolicy::LeaveStuck,
        }
    }
}
