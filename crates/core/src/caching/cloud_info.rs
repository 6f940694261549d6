use chrono::{DateTime, Utc};
use cloudinfo_provider::{
    Attributes, InstanceType, Price, PriceModel, ProviderErrorKind, ProviderId, Region, Service,
    Zone,
};
use log::{debug, warn};
use serde::de::DeserializeOwned;

use crate::errors::{Error, FetchFailure, Result};
use crate::fetch::{FetchTarget, KeyFetcher};
use crate::services::ServiceCatalog;
use crate::status::{RefreshStatus, StatusBook};
use crate::store::{StoreKey, TypedStoreExt};

/// Read-through cache over the store.
///
/// A hit returns whatever the store holds, however old, and never waits
/// for a refresh that might be running for the same key.
#[derive(Clone)]
pub struct CachingCloudInfo {
    fetcher: KeyFetcher,
    catalog: ServiceCatalog,
    status: StatusBook,
}

impl CachingCloudInfo {
    pub fn new(fetcher: KeyFetcher) -> Self {
        let store = fetcher.store().clone();
        Self {
            fetcher,
            catalog: ServiceCatalog::new(store.clone()),
            status: StatusBook::new(store),
        }
    }

    /// Configured providers, sorted.
    pub fn providers(&self) -> Vec<ProviderId> {
        self.fetcher.registry().provider_ids()
    }

    /// Services loaded for `provider` at startup.
    pub async fn services(&self, provider: &str) -> Result<Vec<Service>> {
        self.ensure_provider(provider)?;
        match self.catalog.services(provider).await {
            Ok(Some(services)) => Ok(services),
            Ok(None) => Err(Error::Unavailable {
                key: StoreKey::services(provider).to_string(),
                reason: FetchFailure::new(
                    ProviderErrorKind::NotFound,
                    "service catalog was not loaded",
                ),
            }),
            Err(e) => Err(e),
        }
    }

    pub async fn regions(&self, provider: &str, service: &str) -> Result<Vec<Region>> {
        self.read_through(FetchTarget::regions(provider, service))
            .await
    }

    pub async fn zones(&self, provider: &str, service: &str, region: &str) -> Result<Vec<Zone>> {
        self.read_through(FetchTarget::zones(provider, service, region))
            .await
    }

    pub async fn instance_types(
        &self,
        provider: &str,
        service: &str,
        region: &str,
    ) -> Result<Vec<InstanceType>> {
        self.read_through(FetchTarget::instance_types(provider, service, region))
            .await
    }

    pub async fn attributes(
        &self,
        provider: &str,
        service: &str,
        region: &str,
        instance_type: &str,
    ) -> Result<Attributes> {
        self.read_through(FetchTarget::attributes(
            provider,
            service,
            region,
            instance_type,
        ))
        .await
    }

    /// Price of an instance type. `zone` is `None` for regional prices.
    pub async fn price(
        &self,
        provider: &str,
        service: &str,
        region: &str,
        zone: Option<&str>,
        instance_type: &str,
        model: PriceModel,
    ) -> Result<Price> {
        self.read_through(FetchTarget::price(
            provider,
            service,
            region,
            zone,
            instance_type,
            model,
        ))
        .await
    }

    pub async fn refresh_status(
        &self,
        provider: &str,
        service: &str,
    ) -> Result<Option<RefreshStatus>> {
        self.ensure_provider(provider)?;
        self.status.get(provider, service).await
    }

    pub async fn refresh_statuses(&self) -> Result<Vec<RefreshStatus>> {
        self.status.all().await
    }

    /// Like the typed getters, but also returns when the value was fetched.
    pub async fn lookup<T>(&self, target: FetchTarget) -> Result<(T, DateTime<Utc>)>
    where
        T: DeserializeOwned + Send,
    {
        self.ensure_provider(target.provider())?;
        let key = target.key();

        match self.fetcher.store().get_value::<T>(&key).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => debug!("Cache miss for {}", key),
            Err(e) => warn!("Store read for {} failed, fetching directly: {}", key, e),
        }

        self.fetcher
            .refresh_as::<T>(&target)
            .await
            .map_err(|reason| Error::Unavailable {
                key: key.to_string(),
                reason,
            })
    }

    async fn read_through<T>(&self, target: FetchTarget) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        self.lookup(target).await.map(|(value, _)| value)
    }

    fn ensure_provider(&self, provider: &str) -> Result<()> {
        if self.fetcher.registry().contains(provider) {
            Ok(())
        } else {
            Err(Error::UnknownProvider(provider.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{registry, registry_with_limits, store, MockProvider};
    use cloudinfo_provider::FetchLimits;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;

    fn facade(provider: Arc<MockProvider>) -> CachingCloudInfo {
        CachingCloudInfo::new(KeyFetcher::new(registry(vec![provider]), store()))
    }

    #[tokio::test]
    async fn test_miss_fills_then_hits() {
        let provider = Arc::new(MockProvider::new("amazon"));
        let facade = facade(provider.clone());

        let first = facade
            .instance_types("amazon", "compute", "eu-west-1")
            .await
            .unwrap();
        let second = facade
            .instance_types("amazon", "compute", "eu-west-1")
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].attributes.cpu(), Some(4.0));
        assert_eq!(provider.calls("list_instance_types"), 1);
    }

    #[tokio::test]
    async fn test_failed_fill_is_not_cached() {
        let provider = Arc::new(MockProvider::new("google"));
        provider.set_failure(Some(ProviderErrorKind::Timeout));
        let facade = facade(provider.clone());

        let err = facade.regions("google", "compute").await.unwrap_err();
        assert!(err.is_unavailable());

        provider.set_failure(None);
        let regions = facade.regions("google", "compute").await.unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(provider.calls("list_regions"), 2);
    }

    #[tokio::test]
    async fn test_stale_value_served_while_provider_fails() {
        let provider = Arc::new(MockProvider::new("azure"));
        let facade = facade(provider.clone());

        let price = facade
            .price("azure", "compute", "eu-west-1", None, "m.large", PriceModel::OnDemand)
            .await
            .unwrap();
        assert_eq!(price.value, dec!(0.096));

        provider.set_failure(Some(ProviderErrorKind::Network));
        let cached = facade
            .price("azure", "compute", "eu-west-1", None, "m.large", PriceModel::OnDemand)
            .await
            .unwrap();
        assert_eq!(cached, price);
        assert_eq!(provider.calls("get_price"), 1);
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let facade = facade(Arc::new(MockProvider::new("amazon")));
        let err = facade.zones("oracle", "compute", "x").await.unwrap_err();
        assert!(matches!(err, Error::UnknownProvider(id) if id == "oracle"));
    }

    #[tokio::test]
    async fn test_services_without_catalog_is_unavailable() {
        let facade = facade(Arc::new(MockProvider::new("amazon")));
        assert!(facade.services("amazon").await.unwrap_err().is_unavailable());
        assert_eq!(facade.providers(), vec![ProviderId::from("amazon")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_fill_releases_provider_slot() {
        let provider = Arc::new(MockProvider::new("amazon").with_delay(Duration::from_millis(200)));
        let limits = FetchLimits {
            max_concurrency: 1,
            requests_per_minute: 60_000,
            fetch_timeout: Duration::from_secs(1),
        };
        let facade = CachingCloudInfo::new(KeyFetcher::new(
            registry_with_limits(vec![provider.clone()], limits),
            store(),
        ));

        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), facade.regions("amazon", "compute"))
                .await;
        assert!(cancelled.is_err());

        let zones = tokio::time::timeout(
            Duration::from_secs(3),
            facade.zones("amazon", "compute", "eu-west-1"),
        )
        .await
        .expect("provider slot stays available")
        .unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(provider.peak_concurrency(), 1);

        // The abandoned fill still completed and was stored.
        facade.regions("amazon", "compute").await.unwrap();
        assert_eq!(provider.calls("list_regions"), 1);
    }
}
