//! Wiring of the engine's components around one shared store.

use std::collections::BTreeSet;
use std::sync::Arc;

use cloudinfo_provider::ProviderRegistry;
use log::{info, warn};

use crate::caching::CachingCloudInfo;
use crate::config::EngineConfig;
use crate::errors::Result;
use crate::events::EventBus;
use crate::fetch::KeyFetcher;
use crate::metrics::ScrapeMetrics;
use crate::scraping::{ScrapingDriver, ScrapingHandle};
use crate::services::ServiceManager;
use crate::store::CloudInfoStore;

/// The cache-and-scrape engine.
///
/// Lifecycle: [`bootstrap`](Self::bootstrap) loads the service catalogs,
/// [`start`](Self::start) begins scraping, [`shutdown`](Self::shutdown)
/// stops scraping and closes the store.
pub struct Engine {
    store: Arc<dyn CloudInfoStore>,
    events: EventBus,
    services: ServiceManager,
    driver: ScrapingDriver,
    cloud_info: CachingCloudInfo,
    metrics: ScrapeMetrics,
}

impl Engine {
    /// Validates `config` and wires the components. Nothing is scraped yet.
    ///
    /// Called inside a tokio runtime, this also spawns the metrics recorder;
    /// it ends once the engine and every driver clone are dropped.
    pub fn new(
        config: &EngineConfig,
        registry: ProviderRegistry,
        store: Arc<dyn CloudInfoStore>,
    ) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(registry);
        let events = EventBus::new(config.event_capacity);
        let fetcher = KeyFetcher::new(registry.clone(), store.clone());

        let services = config.enabled_providers().fold(
            ServiceManager::new(registry, store.clone(), events.clone()),
            |manager, (id, settings)| match &settings.services {
                Some(services) => manager.with_static_services(id, services.clone()),
                None => manager,
            },
        );

        let metrics = ScrapeMetrics::new();
        if tokio::runtime::Handle::try_current().is_ok() {
            metrics.spawn_recorder(events.subscribe());
        } else {
            warn!("No async runtime, scrape metrics will not be recorded");
        }

        Ok(Self {
            driver: ScrapingDriver::new(config, fetcher.clone(), events.clone()),
            cloud_info: CachingCloudInfo::new(fetcher),
            services,
            events,
            store,
            metrics,
        })
    }

    pub fn store(&self) -> &Arc<dyn CloudInfoStore> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn cloud_info(&self) -> &CachingCloudInfo {
        &self.cloud_info
    }

    pub fn driver(&self) -> &ScrapingDriver {
        &self.driver
    }

    pub fn services(&self) -> &ServiceManager {
        &self.services
    }

    pub fn metrics(&self) -> &ScrapeMetrics {
        &self.metrics
    }

    /// Loads every provider's service catalog; returns the providers that
    /// will be scraped.
    pub async fn bootstrap(&self) -> BTreeSet<String> {
        let loaded = self.services.load_services().await;
        info!("Bootstrap finished, scraping {} providers", loaded.len());
        loaded
    }

    pub fn start(&self) -> ScrapingHandle {
        self.driver.start()
    }

    /// Stops the driver, waiting for a running pass, then closes the store.
    pub async fn shutdown(&self, handle: ScrapingHandle) -> Result<()> {
        handle.stop().await;
        self.store.close().await?;
        info!("Engine shut down");
        Ok(())
    }
}
