//! Action kinds and retry policy
//!
//! The throttle gate deduplicates on (subject, kind); the retry policy is
//! the per-action descriptor consumed by the dispatch executor.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Closed set of throttleable action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Append to the local detection log
    LogToFile,
    /// Persist snapshot + result set to the store
    DatabaseSave,
    /// Upload to the weather service
    BirdweatherSubmit,
    /// Publish to the message broker
    BrokerPublish,
    /// Broadcast a live update
    LiveBroadcast,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LogToFile => "log_to_file",
            Self::DatabaseSave => "database_save",
            Self::BirdweatherSubmit => "birdweather_submit",
            Self::BrokerPublish => "broker_publish",
            Self::LiveBroadcast => "live_broadcast",
        };
        f.write_str(name)
    }
}

/// Per-action retry descriptor
///
/// `enabled` is the contract field the executor consults; the remaining
/// fields tune its backoff schedule. A returned error is the sole retry
/// signal, so actions that must never be retried (e.g. the log variant)
/// swallow their failures instead of disabling retries here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Policy that never re-invokes the action
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Backoff before the given retry (1-based), capped at five minutes
    pub fn backoff_for(&self, retry: u32) -> Duration {
        const MAX_BACKOFF: Duration = Duration::from_secs(300);
        let factor = self.multiplier.powi(retry.saturating_sub(1) as i32);
        let backoff = self.initial_backoff.mul_f64(factor.max(1.0));
        backoff.min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_exponentially() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            enabled: true,
            max_attempts: 100,
            initial_backoff: Duration::from_secs(60),
            multiplier: 10.0,
        };
        assert_eq!(policy.backoff_for(5), Duration::from_secs(300));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ActionKind::BirdweatherSubmit.to_string(), "birdweather_submit");
    }
}
