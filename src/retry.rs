//! Retry with exponential backoff for rate-limited operations.
//!
//! Purely a consumer of the governor's signal: only [`Error::RateLimited`]
//! is retried, everything else propagates on the first attempt. The
//! governor itself never retries.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};

/// Default number of attempts before the last rate-limit error is re-raised.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base backoff delay.
const BASE_DELAY_MS: u64 = 1_000;
/// Backoff delays never exceed this.
const MAX_DELAY_MS: u64 = 30_000;

/// Run `operation`, retrying on rate-limit rejections with exponential
/// backoff.
///
/// `max_retries` bounds the total number of attempts. Delays are
/// `min(1s * 2^attempt, 30s)` counted from the first failure, i.e. 2s, 4s,
/// 8s, … After the final attempt the last rate-limit error is returned
/// rather than swallowed. Any other error returns immediately.
pub async fn with_retry<T, F, Fut>(mut operation: F, max_retries: u32) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err @ Error::RateLimited { .. }) => {
                attempt += 1;
                if attempt >= max_retries {
                    debug!(attempt, "Retries exhausted, surfacing rate-limit error");
                    return Err(err);
                }
                let delay = backoff_delay(attempt);
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// [`with_retry`] with the default attempt bound of
/// [`DEFAULT_MAX_RETRIES`].
pub async fn with_default_retry<T, F, Fut>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_retry(operation, DEFAULT_MAX_RETRIES).await
}

/// Exponential backoff delay for the given (1-based) failure count.
fn backoff_delay(attempt: u32) -> Duration {
    let millis = BASE_DELAY_MS
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(MAX_DELAY_MS);
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn rate_limited() -> Error {
        Error::rate_limited("rate limit exceeded for hubspot", 1, "hubspot")
    }

    #[test]
    fn test_backoff_delay_doubles_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_millis(2_000));
        assert_eq!(backoff_delay(2), Duration::from_millis(4_000));
        assert_eq!(backoff_delay(3), Duration::from_millis(8_000));
        assert_eq!(backoff_delay(5), Duration::from_millis(30_000));
        assert_eq!(backoff_delay(30), Duration::from_millis(30_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_reraise_last_error() {
        let attempts = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<()> = with_default_retry(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(rate_limited()) }
        })
        .await;

        assert!(result.unwrap_err().is_rate_limited());
        assert_eq!(attempts.load(Ordering::SeqCst), DEFAULT_MAX_RETRIES);
        // Two sleeps happened: 2s after the first failure, 4s after the
        // second. The paused clock makes this exact.
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_rate_limited_attempts() {
        let attempts = AtomicU32::new(0);

        let result = with_retry(
            || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(rate_limited())
                    } else {
                        Ok("created")
                    }
                }
            },
            3,
        )
        .await;

        assert_eq!(result.unwrap(), "created");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_do_not_retry() {
        let attempts = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<()> = with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(Error::Api {
                        status: 500,
                        body: "boom".to_string(),
                    })
                }
            },
            3,
        )
        .await;

        assert!(matches!(result.unwrap_err(), Error::Api { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_makes_one_attempt() {
        let attempts = AtomicU32::new(0);

        let result = with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok(7) }
            },
            3,
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
