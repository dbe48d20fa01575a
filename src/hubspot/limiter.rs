//! HubSpot-specific rate limiter façade.
//!
//! Binds the fixed `"hubspot"` integration id and its static quota to the
//! shared governor so call sites need neither the manager's generic API nor
//! the id string. Pure delegation; the façade holds no state of its own.

use std::sync::Arc;

use crate::error::Result;
use crate::ratelimit::{BackoffStrategy, QuotaConfig, RateLimitHeaders, RateLimitManager};

/// Integration id under which HubSpot is registered with the governor.
pub const HUBSPOT_INTEGRATION_ID: &str = "hubspot";

// HubSpot's published limits for a standard plan.
const MAX_REQUESTS_PER_SECOND: u32 = 10;
const MAX_REQUESTS_PER_DAY: u32 = 250_000;

/// Narrow two-method surface over the shared [`RateLimitManager`] for
/// HubSpot API calls.
#[derive(Clone)]
pub struct HubSpotRateLimiter {
    manager: Arc<RateLimitManager>,
}

impl HubSpotRateLimiter {
    /// Bind to the shared manager, registering HubSpot's default quota if
    /// nothing has registered the id yet (e.g. an override from the service
    /// configuration).
    pub fn new(manager: Arc<RateLimitManager>) -> Self {
        if !manager.is_registered(HUBSPOT_INTEGRATION_ID) {
            manager.register_integration(Self::default_config());
        }
        Self { manager }
    }

    /// HubSpot's static quota configuration.
    pub fn default_config() -> QuotaConfig {
        QuotaConfig {
            integration_id: HUBSPOT_INTEGRATION_ID.to_string(),
            max_requests_per_second: MAX_REQUESTS_PER_SECOND,
            max_requests_per_day: MAX_REQUESTS_PER_DAY,
            backoff_strategy: Some(BackoffStrategy::Exponential),
            backoff_multiplier: Some(2),
        }
    }

    /// Ask the governor to admit one HubSpot request.
    pub fn check_rate_limit(&self) -> Result<()> {
        self.manager.check_rate_limit(HUBSPOT_INTEGRATION_ID)
    }

    /// Feed HubSpot response headers back to the governor.
    pub fn update_from_headers(&self, headers: &RateLimitHeaders) {
        self.manager
            .update_from_headers(HUBSPOT_INTEGRATION_ID, headers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_registers_default_quota() {
        let manager = Arc::new(RateLimitManager::new());
        let _limiter = HubSpotRateLimiter::new(Arc::clone(&manager));

        assert!(manager.is_registered(HUBSPOT_INTEGRATION_ID));
        let state = manager.snapshot(HUBSPOT_INTEGRATION_ID).unwrap();
        assert_eq!(state.current_requests, 0);
    }

    #[test]
    fn test_existing_registration_is_preserved() {
        let manager = Arc::new(RateLimitManager::new());
        manager.register_integration(QuotaConfig {
            integration_id: HUBSPOT_INTEGRATION_ID.to_string(),
            max_requests_per_second: 1,
            max_requests_per_day: 10,
            backoff_strategy: None,
            backoff_multiplier: None,
        });

        let limiter = HubSpotRateLimiter::new(Arc::clone(&manager));

        // The configured 1 req/s override is in effect, not the default 10.
        assert!(limiter.check_rate_limit().is_ok());
        assert!(limiter.check_rate_limit().is_err());
    }

    #[test]
    fn test_delegates_checks_and_updates() {
        let manager = Arc::new(RateLimitManager::new());
        let limiter = HubSpotRateLimiter::new(Arc::clone(&manager));

        for _ in 0..MAX_REQUESTS_PER_SECOND {
            limiter.check_rate_limit().unwrap();
        }
        let err = limiter.check_rate_limit().unwrap_err();
        assert!(err.is_rate_limited());

        let headers = RateLimitHeaders {
            retry_after: Some(7),
            ..Default::default()
        };
        limiter.update_from_headers(&headers);
        let state = manager.snapshot(HUBSPOT_INTEGRATION_ID).unwrap();
        assert!(state.next_available_time > state.last_reset_time);
    }
}
