//! Per-provider fetch limits.

use std::time::Duration;

/// Limits applied to every call made to one provider.
///
/// Controls how aggressively we can call a provider to avoid
/// hitting its rate limits and getting blocked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchLimits {
    /// Maximum concurrent in-flight requests to this provider.
    pub max_concurrency: usize,

    /// Maximum requests allowed per minute.
    pub requests_per_minute: u32,

    /// Upper bound for a single call; exceeding it is a failure for that call only.
    pub fetch_timeout: Duration,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            requests_per_minute: 600,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}
