use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use cloudinfo_provider::{ProviderErrorKind, ProviderRegistry, Service};
use futures::future::join_all;
use log::{error, info};

use super::ServiceCatalog;
use crate::errors::{Error, FetchFailure, Result};
use crate::events::{CloudInfoEvent, EventBus};
use crate::status::StatusBook;
use crate::store::{CloudInfoStore, StoreKey};

/// Seeds the service catalog of every registered provider.
pub struct ServiceManager {
    registry: Arc<ProviderRegistry>,
    catalog: ServiceCatalog,
    status: StatusBook,
    events: EventBus,
    static_services: HashMap<String, Vec<String>>,
}

impl ServiceManager {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        store: Arc<dyn CloudInfoStore>,
        events: EventBus,
    ) -> Self {
        Self {
            registry,
            catalog: ServiceCatalog::new(store.clone()),
            status: StatusBook::new(store),
            events,
            static_services: HashMap::new(),
        }
    }

    /// Uses a fixed service list for `provider` instead of asking it.
    pub fn with_static_services(mut self, provider: impl Into<String>, services: Vec<String>) -> Self {
        self.static_services.insert(provider.into(), services);
        self
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    /// Loads the catalogs of all registered providers concurrently and
    /// returns the providers that loaded.
    ///
    /// A provider that fails is logged and announced, and the others are
    /// unaffected.
    pub async fn load_services(&self) -> BTreeSet<String> {
        let ids = self.registry.provider_ids();
        let loads = ids.into_iter().map(|id| async move {
            let result = self.load_provider(&id).await;
            (id.into_owned(), result)
        });

        let mut loaded = BTreeSet::new();
        for (provider, result) in join_all(loads).await {
            match result {
                Ok(services) => {
                    let names: Vec<String> = services.into_iter().map(|s| s.name).collect();
                    info!("Loaded {} services for '{}'", names.len(), provider);
                    self.events
                        .publish(CloudInfoEvent::services_loaded(&provider, names));
                    loaded.insert(provider);
                }
                Err(e) => {
                    error!("Failed to load services for '{}': {}", provider, e);
                    let reason = match e {
                        Error::Unavailable { reason, .. } => reason,
                        other => FetchFailure::new(ProviderErrorKind::Configuration, other.to_string()),
                    };
                    self.events
                        .publish(CloudInfoEvent::services_load_failed(&provider, reason));
                }
            }
        }

        loaded
    }

    /// Loads one provider's catalog and creates a refresh status for each
    /// of its services.
    pub async fn load_provider(&self, provider: &str) -> Result<Vec<Service>> {
        if !self.registry.contains(provider) {
            return Err(Error::UnknownProvider(provider.to_string()));
        }

        let services = match self.static_services.get(provider) {
            Some(names) => names.iter().map(Service::new).collect(),
            None => self
                .registry
                .list_services(provider)
                .await
                .map_err(|e| Error::Unavailable {
                    key: StoreKey::services(provider).to_string(),
                    reason: e.into(),
                })?,
        };

        let merged = self.catalog.merge(provider, &services).await?;
        for service in &merged {
            self.status.ensure(provider, &service.name).await?;
        }
        Ok(merged)
    }
}
