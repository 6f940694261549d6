#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cloudinfo_core::provider::{
    Attributes, CloudInfoProvider, FetchLimits, InstanceType, Price, PriceModel, ProviderError,
    ProviderRegistry, Region, Service, Zone,
};
use cloudinfo_core::{CloudInfoStore, Engine, EngineConfig, InMemoryStore, Namespace};
use rust_decimal_macros::dec;

/// Provider with one region, one zone and a fixed instance type list.
///
/// Service listing is never slowed down or failed, so the provider always
/// makes it into the catalog.
pub struct ScriptedProvider {
    id: String,
    types: Mutex<Vec<InstanceType>>,
    delay: Mutex<Duration>,
    failing: AtomicBool,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl ScriptedProvider {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            types: Mutex::new(vec![InstanceType::new(
                "m.large",
                Attributes::new().with("cpu", "4").with("memory", "16"),
            )]),
            delay: Mutex::new(Duration::ZERO),
            failing: AtomicBool::new(false),
            calls: Mutex::new(HashMap::new()),
        })
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_instance_types(&self, types: Vec<InstanceType>) {
        *self.types.lock().unwrap() = types;
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().get(operation).copied().unwrap_or(0)
    }

    pub fn data_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(op, _)| **op != "list_services")
            .map(|(_, n)| n)
            .sum()
    }

    async fn enter(&self, operation: &'static str) -> Result<(), ProviderError> {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Network {
                provider: self.id.clone(),
                message: "connection reset by peer".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CloudInfoProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn list_services(&self) -> Result<Vec<Service>, ProviderError> {
        *self.calls.lock().unwrap().entry("list_services").or_insert(0) += 1;
        Ok(vec![Service::new("compute")])
    }

    async fn list_regions(&self, _service: &str) -> Result<Vec<Region>, ProviderError> {
        self.enter("list_regions").await?;
        Ok(vec![Region::new("region-1", "Region One")])
    }

    async fn list_zones(&self, _service: &str, _region: &str) -> Result<Vec<Zone>, ProviderError> {
        self.enter("list_zones").await?;
        Ok(vec![Zone::new("region-1a")])
    }

    async fn list_instance_types(
        &self,
        _service: &str,
        _region: &str,
    ) -> Result<Vec<InstanceType>, ProviderError> {
        self.enter("list_instance_types").await?;
        Ok(self.types.lock().unwrap().clone())
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
        Ok(match model {
            PriceModel::OnDemand => Price::new(model, dec!(0.20), "USD"),
            PriceModel::Spot => Price::new(model, dec!(0.06), "USD"),
        })
    }
}

pub fn limits(timeout: Duration) -> FetchLimits {
    FetchLimits {
        max_concurrency: 4,
        requests_per_minute: 60_000,
        fetch_timeout: timeout,
    }
}

/// Engine over the given providers with an hourly interval.
pub fn engine(providers: &[Arc<ScriptedProvider>], timeout: Duration) -> Engine {
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register_with_limits(provider.clone(), limits(timeout));
    }
    let config = EngineConfig {
        scrape_interval: Duration::from_secs(3600),
        ..EngineConfig::default()
    };
    let store: Arc<dyn CloudInfoStore> = Arc::new(InMemoryStore::new());
    Engine::new(&config, registry, store).unwrap()
}

/// Every data value in the store, keyed by display form.
pub async fn data_snapshot(store: &Arc<dyn CloudInfoStore>) -> Vec<(String, serde_json::Value)> {
    let keys = store
        .list_keys(&cloudinfo_core::KeyPrefix::all())
        .await
        .unwrap();
    let mut values = Vec::new();
    for key in keys {
        if key.namespace() == Namespace::Status {
            continue;
        }
        let entry = store.get(&key).await.unwrap().unwrap();
        values.push((key.to_string(), entry.value));
    }
    values
}
