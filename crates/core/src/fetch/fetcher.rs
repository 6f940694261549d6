use std::sync::Arc;

use chrono::{DateTime, Utc};
use cloudinfo_provider::ProviderRegistry;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{FetchCoordinator, FetchTarget};
use crate::errors::{FetchFailure, Result};
use crate::store::{CloudInfoStore, PutOutcome, StoreEntry, StoreKey, TypedStoreExt};

/// A freshly fetched value and the time its fetch completed.
#[derive(Clone, Debug, PartialEq)]
pub struct Fetched {
    pub value: Value,
    pub fetched_at: DateTime<Utc>,
}

impl Fetched {
    pub fn decode<T: DeserializeOwned>(&self) -> std::result::Result<T, FetchFailure> {
        Ok(serde_json::from_value(self.value.clone())?)
    }
}

/// Fetches keys from their providers and writes them to the store.
#[derive(Clone)]
pub struct KeyFetcher {
    registry: Arc<ProviderRegistry>,
    store: Arc<dyn CloudInfoStore>,
    flights: Arc<FetchCoordinator<Fetched>>,
}

impl KeyFetcher {
    pub fn new(registry: Arc<ProviderRegistry>, store: Arc<dyn CloudInfoStore>) -> Self {
        Self {
            registry,
            store,
            flights: Arc::new(FetchCoordinator::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn CloudInfoStore> {
        &self.store
    }

    pub fn flights(&self) -> &FetchCoordinator<Fetched> {
        &self.flights
    }

    /// Fetches `target` from its provider and stores the result stamped
    /// with the fetch completion time.
    ///
    /// Concurrent calls for the same key share one upstream call. A failed
    /// fetch leaves the stored value untouched. A failed store write is
    /// logged and the fetched value is still returned.
    pub async fn refresh(&self, target: &FetchTarget) -> std::result::Result<Fetched, FetchFailure> {
        let key = target.key();
        let registry = self.registry.clone();
        let store = self.store.clone();
        let target = target.clone();
        let write_key = key.clone();

        self.flights
            .run(&key, async move {
                let value = call_provider(&registry, &target).await?;
                let fetched = Fetched {
                    value,
                    fetched_at: Utc::now(),
                };

                let entry = StoreEntry::new(fetched.value.clone(), fetched.fetched_at);
                match store.put(&write_key, entry).await {
                    Ok(PutOutcome::Rejected) => {
                        debug!("Kept newer stored value for {}", write_key)
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Failed to store {}: {}", write_key, e),
                }

                Ok(fetched)
            })
            .await
    }

    /// [`refresh`](Self::refresh) and decode the value.
    pub async fn refresh_as<T: DeserializeOwned>(
        &self,
        target: &FetchTarget,
    ) -> std::result::Result<(T, DateTime<Utc>), FetchFailure> {
        let fetched = self.refresh(target).await?;
        Ok((fetched.decode()?, fetched.fetched_at))
    }

    /// Stores a value derived from another fetch without calling the
    /// provider, stamped with that fetch's completion time.
    pub async fn store_derived<T>(
        &self,
        key: &StoreKey,
        value: &T,
        fetched_at: DateTime<Utc>,
    ) -> Result<PutOutcome>
    where
        T: Serialize + Sync,
    {
        self.store.put_value(key, value, fetched_at).await
    }
}

async fn call_provider(
    registry: &ProviderRegistry,
    target: &FetchTarget,
) -> std::result::Result<Value, FetchFailure> {
    let value = match target {
        FetchTarget::Regions { provider, service } => {
            serde_json::to_value(registry.list_regions(provider, service).await?)?
        }
        FetchTarget::Zones {
            provider,
            service,
            region,
        } => serde_json::to_value(registry.list_zones(provider, service, region).await?)?,
        FetchTarget::InstanceTypes {
            provider,
            service,
            region,
        } => serde_json::to_value(
            registry
                .list_instance_types(provider, service, region)
                .await?,
        )?,
        FetchTarget::Attributes {
            provider,
            service,
            region,
            instance_type,
        } => serde_json::to_value(
            registry
                .get_attributes(provider, service, region, instance_type)
                .await?,
        )?,
        FetchTarget::Price {
            provider,
            service,
            region,
            zone,
            instance_type,
            model,
        } => serde_json::to_value(
            registry
                .get_price(
                    provider,
                    service,
                    region,
                    zone.as_deref(),
                    instance_type,
                    *model,
                )
                .await?,
        )?,
    };
    Ok(value)
}
