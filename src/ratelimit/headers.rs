//! Rate-limit header parsing.
//!
//! Remote APIs report their authoritative quota view through response
//! headers. Only the three headers the governor consumes are modeled here;
//! everything else is ignored. Header names match case-insensitively.

use reqwest::header::HeaderMap;

/// Parsed rate-limit information from HTTP response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// `X-RateLimit-Remaining`: requests left in the server's current window.
    pub remaining: Option<u32>,
    /// `X-RateLimit-Reset`: epoch seconds when the server's window resets.
    pub reset_at: Option<i64>,
    /// `Retry-After`: relative seconds to wait (typically on a 429).
    pub retry_after: Option<u64>,
}

impl RateLimitHeaders {
    /// Empty header set; updates built from it are no-ops.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from name/value pairs. Unrecognized names and unparsable
    /// values are ignored.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut parsed = Self::new();
        for (name, value) in pairs {
            let value = value.trim();
            if name.eq_ignore_ascii_case("x-ratelimit-remaining") {
                parsed.remaining = value.parse().ok().or(parsed.remaining);
            } else if name.eq_ignore_ascii_case("x-ratelimit-reset") {
                parsed.reset_at = value.parse().ok().or(parsed.reset_at);
            } else if name.eq_ignore_ascii_case("retry-after") {
                parsed.retry_after = value.parse().ok().or(parsed.retry_after);
            }
        }
        parsed
    }

    /// Parse from a real HTTP response header map.
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        Self::from_pairs(
            headers
                .iter()
                .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?))),
        )
    }

    /// True when no recognized header was present.
    pub fn is_empty(&self) -> bool {
        self.remaining.is_none() && self.reset_at.is_none() && self.retry_after.is_none()
    }
}
