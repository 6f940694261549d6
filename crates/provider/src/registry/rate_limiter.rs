//! Token bucket rate limiter for cloud providers.
//!
//! Each registered provider gets its own bucket whose capacity equals the
//! provider's concurrency ceiling and whose refill rate follows its
//! requests-per-minute budget.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use log::{debug, warn};

/// Refill rate used for providers that were never configured.
const DEFAULT_REQUESTS_PER_MINUTE: f64 = 600.0;

/// Burst capacity used for providers that were never configured.
const DEFAULT_BUCKET_CAPACITY: f64 = 5.0;

/// Token bucket for a single provider.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
    /// Tokens per second.
    rate: f64,
    capacity: f64,
}

impl TokenBucket {
    fn with_config(config: &RateLimitConfig) -> Self {
        let capacity = config.burst_capacity.max(1.0);
        Self {
            tokens: capacity,
            last_update: Instant::now(),
            rate: f64::from(config.requests_per_minute.max(1)) / 60.0,
            capacity,
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_update = now;
    }

    /// Takes a token if one is available, otherwise returns how long to wait for one.
    fn take(&mut self) -> Result<(), Duration> {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - self.tokens) / self.rate))
        }
    }
}

/// Rate limiter configuration for a provider.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst_capacity: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE as u32,
            burst_capacity: DEFAULT_BUCKET_CAPACITY,
        }
    }
}

/// Per-provider token bucket rate limiter.
///
/// Buckets are normally created through [`configure`](Self::configure) when a
/// provider is registered; an unknown provider gets a default bucket.
#[derive(Default)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the buckets mutex, recovering from poison if necessary.
    ///
    /// A poisoned bucket map only means slightly inaccurate limiting.
    fn lock_buckets(&self) -> MutexGuard<'_, HashMap<String, TokenBucket>> {
        self.buckets.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter buckets mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Configure (or reconfigure) the bucket of a provider. Resets its tokens.
    pub fn configure(&self, provider: &str, config: RateLimitConfig) {
        self.lock_buckets()
            .insert(provider.to_string(), TokenBucket::with_config(&config));
    }

    /// Waits until a token for `provider` is available and takes it.
    pub async fn acquire(&self, provider: &str) {
        loop {
            let wait = {
                let mut buckets = self.lock_buckets();
                let bucket = buckets
                    .entry(provider.to_string())
                    .or_insert_with(|| TokenBucket::with_config(&RateLimitConfig::default()));

                match bucket.take() {
                    Ok(()) => return,
                    Err(wait) => wait,
                }
            };

            debug!("Rate limiter: waiting {:?} for provider '{}'", wait, provider);
            tokio::time::sleep(wait).await;
        }
    }

    /// Takes a token without waiting. Returns false when rate limited.
    pub fn try_acquire(&self, provider: &str) -> bool {
        let mut buckets = self.lock_buckets();
        buckets
            .entry(provider.to_string())
            .or_insert_with(|| TokenBucket::with_config(&RateLimitConfig::default()))
            .take()
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_drains_to_capacity() {
        let mut bucket = TokenBucket::with_config(&RateLimitConfig {
            requests_per_minute: 60,
            burst_capacity: 3.0,
        });

        for _ in 0..3 {
            assert!(bucket.take().is_ok());
        }
        let wait = bucket.take().unwrap_err();
        assert!(wait > Duration::ZERO && wait <= Duration::from_secs(1));
    }

    #[test]
    fn test_bucket_refills_over_time() {
        let mut bucket = TokenBucket::with_config(&RateLimitConfig {
            requests_per_minute: 60,
            burst_capacity: 1.0,
        });

        assert!(bucket.take().is_ok());
        assert!(bucket.take().is_err());

        bucket.last_update = Instant::now() - Duration::from_secs(2);
        assert!(bucket.take().is_ok());
    }

    #[test]
    fn test_per_provider_isolation() {
        let limiter = RateLimiter::new();
        let config = RateLimitConfig {
            requests_per_minute: 1,
            burst_capacity: 2.0,
        };
        limiter.configure("amazon", config.clone());
        limiter.configure("google", config);

        assert!(limiter.try_acquire("amazon"));
        assert!(limiter.try_acquire("amazon"));
        assert!(!limiter.try_acquire("amazon"));

        assert!(limiter.try_acquire("google"));
    }

    #[test]
    fn test_configure_resets_bucket() {
        let limiter = RateLimiter::new();
        limiter.configure(
            "azure",
            RateLimitConfig {
                requests_per_minute: 1,
                burst_capacity: 1.0,
            },
        );
        assert!(limiter.try_acquire("azure"));
        assert!(!limiter.try_acquire("azure"));

        limiter.configure(
            "azure",
            RateLimitConfig {
                requests_per_minute: 1,
                burst_capacity: 1.0,
            },
        );
        assert!(limiter.try_acquire("azure"));
    }

    #[tokio::test]
    async fn test_async_acquire_waits_for_refill() {
        let limiter = RateLimiter::new();
        limiter.configure(
            "oracle",
            RateLimitConfig {
                requests_per_minute: 6000, // 100/second for a fast test
                burst_capacity: 1.0,
            },
        );

        limiter.acquire("oracle").await;
        let start = Instant::now();
        limiter.acquire("oracle").await;
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
