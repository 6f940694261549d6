//! Provider registry module.
//!
//! This module gates every call made to a provider:
//! - Provider registration, selected by configuration at startup
//! - Concurrency ceiling per provider
//! - Token-bucket rate limiting per provider
//! - Per-fetch timeout

mod rate_limiter;
mod registry;

pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use registry::ProviderRegistry;
