//! Quota configuration and live counter state.

use serde::{Deserialize, Serialize};

/// Backoff strategy declared for an integration.
///
/// Carried as reserved configuration for callers; the governor itself does
/// not vary admission behavior by strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    Exponential,
    Linear,
    Fixed,
}

/// Quota configuration for a single integration.
///
/// Immutable once registered with the manager. Re-registering the same
/// integration id replaces the config and resets all counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Unique key identifying the integration (e.g. "hubspot")
    pub integration_id: String,
    /// Maximum requests admitted per 1-second window
    pub max_requests_per_second: u32,
    /// Maximum requests admitted per day
    pub max_requests_per_day: u32,
    /// Declared backoff strategy (reserved, see [`BackoffStrategy`])
    #[serde(default)]
    pub backoff_strategy: Option<BackoffStrategy>,
    /// Declared backoff multiplier (reserved)
    #[serde(default)]
    pub backoff_multiplier: Option<u32>,
}

/// Live counters for a single integration.
///
/// Mutated only by the manager, under that integration's lock. All
/// timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaState {
    /// Requests admitted in the current 1-second window
    pub current_requests: u32,
    /// Start of the current 1-second window
    pub last_reset_time: i64,
    /// Earliest time the remote is expected to accept a request again.
    /// Advanced by server-reported reset/retry hints, never moved backward.
    pub next_available_time: i64,
    /// Requests admitted in the current day window
    pub daily_requests: u32,
    /// Start of the current day window
    pub last_daily_reset: i64,
}

impl QuotaState {
    /// Fresh state with all counters at zero and every window anchored at `now_ms`.
    pub fn new(now_ms: i64) -> Self {
        Self {
            current_requests: 0,
            last_reset_time: now_ms,
            next_available_time: now_ms,
            daily_requests: 0,
            last_daily_reset: now_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state_is_zeroed() {
        let state = QuotaState::new(1_000_000);
        assert_eq!(state.current_requests, 0);
        assert_eq!(state.daily_requests, 0);
        assert_eq!(state.last_reset_time, 1_000_000);
        assert_eq!(state.last_daily_reset, 1_000_000);
        assert_eq!(state.next_available_time, 1_000_000);
    }

    #[test]
    fn test_backoff_strategy_serde_names() {
        let config: QuotaConfig = serde_yaml::from_str(
            r#"
integration_id: hubspot
max_requests_per_second: 10
max_requests_per_day: 250000
backoff_strategy: exponential
backoff_multiplier: 2
"#,
        )
        .unwrap();

        assert_eq!(config.backoff_strategy, Some(BackoffStrategy::Exponential));
        assert_eq!(config.backoff_multiplier, Some(2));
    }

    #[test]
    fn test_backoff_fields_are_optional() {
        let config: QuotaConfig = serde_yaml::from_str(
            r#"
integration_id: salesforce
max_requests_per_second: 5
max_requests_per_day: 100000
"#,
        )
        .unwrap();

        assert_eq!(config.backoff_strategy, None);
        assert_eq!(config.backoff_multiplier, None);
    }
}
