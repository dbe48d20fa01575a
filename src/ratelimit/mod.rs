//! Rate limiting logic and state management.

mod headers;
mod manager;
mod quota;

pub use headers::RateLimitHeaders;
pub use manager::RateLimitManager;
pub use quota::{BackoffStrategy, QuotaConfig, QuotaState};
