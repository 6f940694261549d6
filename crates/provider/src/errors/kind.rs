use serde::{Deserialize, Serialize};

/// Coarse classification of a provider failure.
///
/// The engine never retries on its own (the scrape interval is the retry
/// cadence), so the kind only decides how loudly a failure is logged and
/// what ends up in a refresh status.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// The requested entity does not exist upstream.
    NotFound,
    /// The provider does not implement the operation.
    NotSupported,
    /// Upstream rate limit (HTTP 429 or equivalent).
    RateLimited,
    /// The fetch timeout elapsed.
    Timeout,
    /// Missing or rejected credentials.
    Unauthorized,
    /// Transport failure.
    Network,
    /// Any other upstream failure.
    Provider,
    /// Local misconfiguration (unknown provider, unreadable snapshot).
    Configuration,
}

impl ProviderErrorKind {
    /// Whether the next scrape pass has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Timeout | Self::Network | Self::Provider
        )
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::NotFound => "not_found",
            Self::NotSupported => "not_supported",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::Unauthorized => "unauthorized",
            Self::Network => "network",
            Self::Provider => "provider",
            Self::Configuration => "configuration",
        };
        f.write_str(label)
    }
}
