//! Test doubles shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cloudinfo_provider::{
    Attributes, CloudInfoProvider, FetchLimits, InstanceType, Price, PriceModel, ProviderError,
    ProviderErrorKind, ProviderRegistry, Region, Service, Zone,
};
use rust_decimal_macros::dec;

use crate::store::{CloudInfoStore, InMemoryStore};

/// In-memory provider with one region, two zones and two instance types.
pub struct MockProvider {
    id: String,
    services: Vec<Service>,
    delay: Duration,
    spot: bool,
    failure: Mutex<Option<ProviderErrorKind>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockProvider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            services: vec![Service::new("compute")],
            delay: Duration::ZERO,
            spot: true,
            failure: Mutex::new(None),
            calls: Mutex::new(HashMap::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn with_services(mut self, services: &[&str]) -> Self {
        self.services = services.iter().map(|s| Service::new(*s)).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn without_spot(mut self) -> Self {
        self.spot = false;
        self
    }

    /// Makes every later call fail with `kind`, or succeed again with `None`.
    pub fn set_failure(&self, kind: Option<ProviderErrorKind>) {
        *self.failure.lock().unwrap() = kind;
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn enter(&self, operation: &'static str) -> Result<(), ProviderError> {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let failure = *self.failure.lock().unwrap();
        match failure {
            None => Ok(()),
            Some(ProviderErrorKind::Timeout) => Err(ProviderError::Timeout {
                provider: self.id.clone(),
            }),
            Some(ProviderErrorKind::Network) => Err(ProviderError::Network {
                provider: self.id.clone(),
                message: "connection refused".to_string(),
            }),
            Some(ProviderErrorKind::NotFound) => {
                Err(ProviderError::NotFound(operation.to_string()))
            }
            Some(_) => Err(ProviderError::ProviderError {
                provider: self.id.clone(),
                message: "internal error".to_string(),
            }),
        }
    }

    fn instance_types() -> Vec<InstanceType> {
        vec![
            InstanceType::new(
                "m.large",
                Attributes::new().with("cpu", "4").with("memory", "16"),
            ),
            InstanceType::new(
                "m.xlarge",
                Attributes::new().with("cpu", "8").with("memory", "32"),
            ),
        ]
    }
}

#[async_trait]
impl CloudInfoProvider for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn list_services(&self) -> Result<Vec<Service>, ProviderError> {
        self.enter("list_services").await?;
        Ok(self.services.clone())
    }

    async fn list_regions(&self, _service: &str) -> Result<Vec<Region>, ProviderError> {
        self.enter("list_regions").await?;
        Ok(vec![Region::new("eu-west-1", "EU (Ireland)")])
    }

    async fn list_zones(&self, _service: &str, region: &str) -> Result<Vec<Zone>, ProviderError> {
        self.enter("list_zones").await?;
        Ok(vec![
            Zone::new(format!("{}a", region)),
            Zone::new(format!("{}b", region)),
        ])
    }

    async fn list_instance_types(
        &self,
        _service: &str,
        _region: &str,
    ) -> Result<Vec<InstanceType>, ProviderError> {
        self.enter("list_instance_types").await?;
        Ok(Self::instance_types())
    }

    async fn get_attributes(
        &self,
        _service: &str,
        _region: &str,
        instance_type: &str,
    ) -> Result<Attributes, ProviderError> {
        self.enter("get_attributes").await?;
        Self::instance_types()
            .into_iter()
            .find(|t| t.name == instance_type)
            .map(|t| t.attributes)
            .ok_or_else(|| ProviderError::NotFound(instance_type.to_string()))
    }

    async fn get_price(
        &self,
        _service: &str,
        _region: &str,
        _zone: Option<&str>,
        _instance_type: &str,
        model: PriceModel,
    ) -> Result<Price, ProviderError> {
        self.enter("get_price").await?;
        match model {
            PriceModel::OnDemand => Ok(Price::new(model, dec!(0.096), "USD")),
            PriceModel::Spot if self.spot => Ok(Price::new(model, dec!(0.031), "USD")),
            PriceModel::Spot => Err(ProviderError::not_supported(&self.id, "spot prices")),
        }
    }
}

/// Registry holding the given providers with generous limits.
pub fn registry(providers: Vec<Arc<MockProvider>>) -> Arc<ProviderRegistry> {
    registry_with_limits(
        providers,
        FetchLimits {
            max_concurrency: 4,
            requests_per_minute: 60_000,
            fetch_timeout: Duration::from_secs(5),
        },
    )
}

pub fn registry_with_limits(
    providers: Vec<Arc<MockProvider>>,
    limits: FetchLimits,
) -> Arc<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register_with_limits(provider, limits.clone());
    }
    Arc::new(registry)
}

pub fn store() -> Arc<dyn CloudInfoStore> {
    Arc::new(InMemoryStore::new())
}
