//! Error types for the Quotaguard service.

use thiserror::Error;

/// Main error type for Quotaguard operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An integration id was used before `register_integration` was called
    /// for it. This is a wiring bug, not a runtime condition.
    #[error("integration {0} is not registered")]
    NotRegistered(String),

    /// A request was rejected by the governor, or the remote API answered
    /// with HTTP 429. Recoverable: callers either retry after `retry_after`
    /// seconds or surface a 429 of their own.
    #[error("{message}")]
    RateLimited {
        message: String,
        /// Seconds until the caller should try again.
        retry_after: u64,
        /// The integration whose quota was exhausted.
        integration_id: String,
    },

    /// Configuration-related errors
    #[error("configuration error: {0}")]
    Config(String),

    /// The remote API answered with a non-success status other than 429.
    #[error("remote API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// HTTP transport errors
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body decoding errors
    #[error("failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build the rate-limit rejection signal.
    pub fn rate_limited(
        message: impl Into<String>,
        retry_after: u64,
        integration_id: impl Into<String>,
    ) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after,
            integration_id: integration_id.into(),
        }
    }

    /// Whether this error is the retryable rate-limit signal.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// The retry hint in seconds, if this is a rate-limit rejection.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Result type alias for Quotaguard operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_accessors() {
        let err = Error::rate_limited("rate limit exceeded for hubspot", 5, "hubspot");
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(5));
        assert_eq!(err.to_string(), "rate limit exceeded for hubspot");
    }

    #[test]
    fn test_other_errors_carry_no_retry_hint() {
        let err = Error::NotRegistered("salesforce".to_string());
        assert!(!err.is_rate_limited());
        assert_eq!(err.retry_after(), None);
    }
}
