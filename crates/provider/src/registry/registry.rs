//! Provider registry for gating calls to cloud providers.
//!
//! The registry owns every configured provider and is the only path through
//! which the engine reaches them. Each call:
//! 1. Waits for a slot under the provider's concurrency ceiling
//! 2. Takes a rate limiter token
//! 3. Runs under the provider's fetch timeout

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::Semaphore;

use super::{RateLimitConfig, RateLimiter};
use crate::errors::ProviderError;
use crate::models::{Attributes, InstanceType, Price, PriceModel, ProviderId, Region, Service, Zone};
use crate::provider::{CloudInfoProvider, FetchLimits};

struct ProviderSlot {
    provider: Arc<dyn CloudInfoProvider>,
    limits: FetchLimits,
    permits: Arc<Semaphore>,
}

/// Registry of the providers enabled for this process.
#[derive(Default)]
pub struct ProviderRegistry {
    slots: BTreeMap<String, ProviderSlot>,
    rate_limiter: RateLimiter,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider with its own default [`FetchLimits`].
    pub fn register(&mut self, provider: Arc<dyn CloudInfoProvider>) {
        let limits = provider.fetch_limits();
        self.register_with_limits(provider, limits);
    }

    /// Registers a provider with explicit limits (usually from configuration).
    ///
    /// Registering the same id twice replaces the previous provider.
    pub fn register_with_limits(&mut self, provider: Arc<dyn CloudInfoProvider>, limits: FetchLimits) {
        let id = provider.id().to_string();
        let max_concurrency = limits.max_concurrency.max(1);

        self.rate_limiter.configure(
            &id,
            RateLimitConfig {
                requests_per_minute: limits.requests_per_minute,
                burst_capacity: max_concurrency as f64,
            },
        );

        info!(
            "Registered provider '{}' (concurrency {}, {} req/min, timeout {:?})",
            id, max_concurrency, limits.requests_per_minute, limits.fetch_timeout
        );

        if self
            .slots
            .insert(
                id.clone(),
                ProviderSlot {
                    provider,
                    limits,
                    permits: Arc::new(Semaphore::new(max_concurrency)),
                },
            )
            .is_some()
        {
            warn!("Provider '{}' was registered twice, keeping the latest", id);
        }
    }

    /// Identifiers of all registered providers, sorted.
    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.slots
            .keys()
            .map(|id| ProviderId::Owned(id.clone()))
            .collect()
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.slots.contains_key(provider)
    }

    pub fn limits(&self, provider: &str) -> Option<&FetchLimits> {
        self.slots.get(provider).map(|slot| &slot.limits)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Runs `call` against `provider` under its concurrency ceiling, rate
    /// limit and fetch timeout.
    ///
    /// A timed-out call is reported as [`ProviderError::Timeout`]; the
    /// underlying future is dropped.
    pub async fn call<T, F, Fut>(
        &self,
        provider: &str,
        operation: &str,
        call: F,
    ) -> Result<T, ProviderError>
    where
        F: FnOnce(Arc<dyn CloudInfoProvider>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let slot = self
            .slots
            .get(provider)
            .ok_or_else(|| ProviderError::UnknownProvider(provider.to_string()))?;

        let _permit = slot
            .permits
            .acquire()
            .await
            .map_err(|_| ProviderError::ProviderError {
                provider: provider.to_string(),
                message: "provider gate closed".to_string(),
            })?;

        self.rate_limiter.acquire(provider).await;

        debug!("Calling '{}' {}", provider, operation);
        match tokio::time::timeout(slot.limits.fetch_timeout, call(slot.provider.clone())).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Provider '{}' {} timed out after {:?}",
                    provider, operation, slot.limits.fetch_timeout
                );
                Err(ProviderError::Timeout {
                    provider: provider.to_string(),
                })
            }
        }
    }

    pub async fn list_services(&self, provider: &str) -> Result<Vec<Service>, ProviderError> {
        self.call(provider, "list_services", |p| async move {
            p.list_services().await
        })
        .await
    }

    pub async fn list_regions(
        &self,
        provider: &str,
        service: &str,
    ) -> Result<Vec<Region>, ProviderError> {
        self.call(provider, "list_regions", |p| async move {
            p.list_regions(service).await
        })
        .await
    }

    pub async fn list_zones(
        &self,
        provider: &str,
        service: &str,
        region: &str,
    ) -> Result<Vec<Zone>, ProviderError> {
        self.call(provider, "list_zones", |p| async move {
            p.list_zones(service, region).await
        })
        .await
    }

    pub async fn list_instance_types(
        &self,
        provider: &str,
        service: &str,
        region: &str,
    ) -> Result<Vec<InstanceType>, ProviderError> {
        self.call(provider, "list_instance_types", |p| async move {
            p.list_instance_types(service, region).await
        })
        .await
    }

    pub async fn get_attributes(
        &self,
        provider: &str,
        service: &str,
        region: &str,
        instance_type: &str,
    ) -> Result<Attributes, ProviderError> {
        self.call(provider, "get_attributes", |p| async move {
            p.get_attributes(service, region, instance_type).await
        })
        .await
    }

    pub async fn get_price(
        &self,
        provider: &str,
        service: &str,
        region: &str,
        zone: Option<&str>,
        instance_type: &str,
        model: PriceModel,
    ) -> Result<Price, ProviderError> {
        self.call(provider, "get_price", |p| async move {
            p.get_price(service, region, zone, instance_type, model).await
        })
        .await
    }
}
