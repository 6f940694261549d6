use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use cloudinfo_provider::Service;

use crate::errors::Result;
use crate::store::{CloudInfoStore, KeyPrefix, Namespace, StoreKey, TypedStoreExt};

/// Per-provider service lists kept in the store.
///
/// The catalog only grows: merging a list keeps every service already
/// known, so entries seen by earlier loads are never lost.
#[derive(Clone)]
pub struct ServiceCatalog {
    store: Arc<dyn CloudInfoStore>,
}

impl ServiceCatalog {
    pub fn new(store: Arc<dyn CloudInfoStore>) -> Self {
        Self { store }
    }

    pub async fn services(&self, provider: &str) -> Result<Option<Vec<Service>>> {
        Ok(self
            .store
            .get_value::<Vec<Service>>(&StoreKey::services(provider))
            .await?
            .map(|(services, _)| services))
    }

    /// Merges `services` into the provider's catalog and returns the result.
    pub async fn merge(&self, provider: &str, services: &[Service]) -> Result<Vec<Service>> {
        let key = StoreKey::services(provider);
        let (known, written_at) = match self.store.get_value::<Vec<Service>>(&key).await? {
            Some((known, written_at)) => (known, Some(written_at)),
            None => (Vec::new(), None),
        };

        let merged: Vec<Service> = known
            .into_iter()
            .chain(services.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let now = Utc::now();
        let stamp = written_at.map_or(now, |at| at.max(now));
        self.store.put_value(&key, &merged, stamp).await?;
        Ok(merged)
    }

    /// Every catalogued (provider, service) pair, sorted.
    pub async fn pairs(&self) -> Result<Vec<(String, String)>> {
        let keys = self
            .store
            .list_keys(&KeyPrefix::namespace(Namespace::Services))
            .await?;

        let mut pairs = Vec::new();
        for key in keys {
            let provider = key.provider().to_string();
            if let Some((services, _)) = self.store.get_value::<Vec<Service>>(&key).await? {
                pairs.extend(services.into_iter().map(|s| (provider.clone(), s.name)));
            }
        }
        Ok(pairs)
    }
}
