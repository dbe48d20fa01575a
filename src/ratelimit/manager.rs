//! Core admission-control governor.
//!
//! The manager owns one `(QuotaConfig, QuotaState)` pair per registered
//! integration and is the single authority for admission decisions. Window
//! rolls, the admission decision, and the counter increment happen inside
//! one critical section per integration; integrations never contend with
//! each other's locks.

use chrono::{Days, LocalResult, TimeZone, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, trace};

use crate::error::{Error, Result};

use super::headers::RateLimitHeaders;
use super::quota::{QuotaConfig, QuotaState};

/// Length of the per-second window in milliseconds.
const SECOND_WINDOW_MS: i64 = 1_000;
/// Length of the per-day window in milliseconds.
const DAY_WINDOW_MS: i64 = 86_400_000;

/// One registered integration: immutable config plus locked live counters.
struct Integration {
    config: QuotaConfig,
    state: Mutex<QuotaState>,
}

/// The shared rate-limit governor.
///
/// Constructed once at the composition root and passed (as an `Arc`) to
/// every façade and collaborator that needs admission decisions. The map is
/// sharded, so checks for different integrations proceed in parallel.
pub struct RateLimitManager {
    integrations: DashMap<String, Integration>,
}

impl RateLimitManager {
    /// Create an empty governor with no integrations registered.
    pub fn new() -> Self {
        Self {
            integrations: DashMap::new(),
        }
    }

    /// Register an integration's quota configuration.
    ///
    /// Idempotent per id: re-registering replaces the config and resets all
    /// counters. Must be called before any `check_rate_limit` for the id.
    pub fn register_integration(&self, config: QuotaConfig) {
        self.register_integration_at(config, now_ms());
    }

    /// [`register_integration`](Self::register_integration) against an
    /// explicit clock, for deterministic callers and tests.
    pub fn register_integration_at(&self, config: QuotaConfig, now_ms: i64) {
        info!(
            integration = %config.integration_id,
            max_per_second = config.max_requests_per_second,
            max_per_day = config.max_requests_per_day,
            "Registering integration"
        );

        let id = config.integration_id.clone();
        let integration = Integration {
            config,
            state: Mutex::new(QuotaState::new(now_ms)),
        };
        self.integrations.insert(id, integration);
    }

    /// Decide whether one request for `integration_id` may proceed now.
    ///
    /// On admission both the second and day counters are incremented. On
    /// rejection nothing is incremented and the error carries a retry hint
    /// in seconds.
    pub fn check_rate_limit(&self, integration_id: &str) -> Result<()> {
        self.check_rate_limit_at(integration_id, now_ms())
    }

    /// [`check_rate_limit`](Self::check_rate_limit) against an explicit
    /// clock, for deterministic callers and tests.
    pub fn check_rate_limit_at(&self, integration_id: &str, now_ms: i64) -> Result<()> {
        let integration = self
            .integrations
            .get(integration_id)
            .ok_or_else(|| Error::NotRegistered(integration_id.to_string()))?;

        let mut state = integration.state.lock();
        roll_windows(&mut state, now_ms);

        if state.current_requests >= integration.config.max_requests_per_second {
            let retry_after = ceil_seconds(state.next_available_time - now_ms);
            debug!(
                integration = %integration_id,
                current = state.current_requests,
                retry_after,
                "Per-second rate limit exceeded"
            );
            return Err(Error::rate_limited(
                format!("rate limit exceeded for {integration_id}"),
                retry_after,
                integration_id,
            ));
        }

        if state.daily_requests >= integration.config.max_requests_per_day {
            let retry_after = ceil_seconds(next_local_midnight_ms(now_ms) - now_ms);
            debug!(
                integration = %integration_id,
                daily = state.daily_requests,
                retry_after,
                "Daily rate limit exceeded"
            );
            return Err(Error::rate_limited(
                format!("daily rate limit exceeded for {integration_id}"),
                retry_after,
                integration_id,
            ));
        }

        state.current_requests += 1;
        state.daily_requests += 1;

        trace!(
            integration = %integration_id,
            current = state.current_requests,
            daily = state.daily_requests,
            "Request admitted"
        );
        Ok(())
    }

    /// Fold server-reported quota headers into the integration's state.
    ///
    /// Unknown ids are a silent no-op: header feedback can arrive for calls
    /// made before a process restart re-registered everything.
    ///
    /// `X-RateLimit-Remaining` reconciles the second-window counter downward
    /// (the server's remaining count is authoritative, never trusted
    /// upward). `X-RateLimit-Reset` and `Retry-After` only ever advance
    /// `next_available_time`.
    pub fn update_from_headers(&self, integration_id: &str, headers: &RateLimitHeaders) {
        self.update_from_headers_at(integration_id, headers, now_ms());
    }

    /// [`update_from_headers`](Self::update_from_headers) against an
    /// explicit clock.
    pub fn update_from_headers_at(
        &self,
        integration_id: &str,
        headers: &RateLimitHeaders,
        now_ms: i64,
    ) {
        let Some(integration) = self.integrations.get(integration_id) else {
            return;
        };

        let mut state = integration.state.lock();
        roll_windows(&mut state, now_ms);

        if let Some(remaining) = headers.remaining {
            state.current_requests = state.current_requests.saturating_sub(remaining);
        }

        // Header values are attacker-controlled; saturate instead of
        // trusting them to stay in range.
        if let Some(reset_at) = headers.reset_at {
            state.next_available_time = state
                .next_available_time
                .max(reset_at.saturating_mul(1_000));
        }

        if let Some(retry_after) = headers.retry_after {
            let retry_ms = i64::try_from(retry_after)
                .unwrap_or(i64::MAX)
                .saturating_mul(1_000);
            state.next_available_time = state
                .next_available_time
                .max(now_ms.saturating_add(retry_ms));
        }

        trace!(
            integration = %integration_id,
            current = state.current_requests,
            next_available = state.next_available_time,
            "State updated from response headers"
        );
    }

    /// Whether an integration id has been registered.
    pub fn is_registered(&self, integration_id: &str) -> bool {
        self.integrations.contains_key(integration_id)
    }

    /// Snapshot an integration's live counters.
    ///
    /// Returns `None` for unknown ids. Primarily useful for testing and
    /// diagnostics.
    pub fn snapshot(&self, integration_id: &str) -> Option<QuotaState> {
        self.integrations
            .get(integration_id)
            .map(|integration| integration.state.lock().clone())
    }

    /// Number of registered integrations.
    pub fn integration_count(&self) -> usize {
        self.integrations.len()
    }
}

impl Default for RateLimitManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Reset expired second/day windows in place.
fn roll_windows(state: &mut QuotaState, now_ms: i64) {
    if now_ms - state.last_reset_time >= SECOND_WINDOW_MS {
        state.current_requests = 0;
        state.last_reset_time = now_ms;
    }

    if now_ms - state.last_daily_reset >= DAY_WINDOW_MS {
        state.daily_requests = 0;
        state.last_daily_reset = now_ms;
    }
}

/// Round a millisecond delta up to whole seconds, clamping negatives to 0.
fn ceil_seconds(delta_ms: i64) -> u64 {
    if delta_ms <= 0 {
        0
    } else {
        (delta_ms.saturating_add(999) / 1_000) as u64
    }
}

/// Current wall-clock time in epoch milliseconds.
fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Epoch milliseconds of the next local midnight after `now_ms`.
///
/// Falls back to `now + 24h` if the timestamp cannot be represented in the
/// local timezone (e.g. a DST gap at midnight).
fn next_local_midnight_ms(now_ms: i64) -> i64 {
    let local_now = match chrono::Local.timestamp_millis_opt(now_ms) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t,
        LocalResult::None => return now_ms + DAY_WINDOW_MS,
    };

    let midnight = local_now
        .date_naive()
        .checked_add_days(Days::new(1))
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .and_then(|naive| chrono::Local.from_local_datetime(&naive).earliest());

    match midnight {
        Some(t) => t.timestamp_millis(),
        None => now_ms + DAY_WINDOW_MS,
    }
}
