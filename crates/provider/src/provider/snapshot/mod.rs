//! Snapshot provider.
//!
//! Serves provider data from a JSON document loaded at startup. It stands in
//! for a real vendor API in local runs and integration tests, and behaves like
//! one: missing entries are reported as [`ProviderError::NotFound`].
//!
//! Document shape:
//!
//! ```json
//! {
//!   "services": ["compute"],
//!   "regions": { "compute": [{ "id": "eu-west-1", "name": "EU (Ireland)" }] },
//!   "zones": { "eu-west-1": ["eu-west-1a", "eu-west-1b"] },
//!   "instance_types": {
//!     "eu-west-1": [{ "name": "m5.large", "attributes": { "cpu": "2", "memory": "8" } }]
//!   },
//!   "prices": [
//!     { "region": "eu-west-1", "instance_type": "m5.large", "model": "on_demand", "value": 0.107, "currency": "USD" },
//!     { "region": "eu-west-1", "zone": "eu-west-1a", "instance_type": "m5.large", "model": "spot", "value": 0.035, "currency": "USD" }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use log::{debug, info};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::ProviderError;
use crate::models::{Attributes, InstanceType, Price, PriceModel, Region, Service, Zone};
use crate::provider::{CloudInfoProvider, FetchLimits};

/// One price line of a snapshot document.
#[derive(Clone, Debug, Deserialize)]
pub struct SnapshotPrice {
    pub region: String,
    /// Absent for regional prices; for spot prices an absent zone applies to every zone.
    #[serde(default)]
    pub zone: Option<String>,
    pub instance_type: String,
    pub model: PriceModel,
    pub value: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Parsed snapshot document.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub regions: HashMap<String, Vec<Region>>,
    #[serde(default)]
    pub zones: HashMap<String, Vec<Zone>>,
    #[serde(default)]
    pub instance_types: HashMap<String, Vec<InstanceType>>,
    #[serde(default)]
    pub prices: Vec<SnapshotPrice>,
}

/// Provider backed by a [`SnapshotDocument`].
pub struct SnapshotProvider {
    id: String,
    document: SnapshotDocument,
    limits: FetchLimits,
}

impl SnapshotProvider {
    pub fn new(id: impl Into<String>, document: SnapshotDocument) -> Self {
        Self {
            id: id.into(),
            document,
            limits: FetchLimits::default(),
        }
    }

    /// Loads a snapshot document from disk.
    pub fn from_path(id: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let id = id.into();
        let raw = std::fs::read_to_string(path.as_ref())?;
        let document: SnapshotDocument = serde_json::from_str(&raw)?;
        info!(
            "Loaded snapshot for '{}' from {} ({} services, {} prices)",
            id,
            path.as_ref().display(),
            document.services.len(),
            document.prices.len()
        );
        Ok(Self::new(id, document))
    }

    pub fn with_limits(mut self, limits: FetchLimits) -> Self {
        self.limits = limits;
        self
    }

    fn not_found(&self, what: String) -> ProviderError {
        debug!("Snapshot '{}' has no entry for {}", self.id, what);
        ProviderError::NotFound(format!("{}: {}", self.id, what))
    }

    fn ensure_service(&self, service: &str) -> Result<(), ProviderError> {
        if self.document.services.iter().any(|s| s == service) {
            Ok(())
        } else {
            Err(self.not_found(format!("service {}", service)))
        }
    }
}

#[async_trait]
impl CloudInfoProvider for SnapshotProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn fetch_limits(&self) -> FetchLimits {
        self.limits.clone()
    }

    async fn list_services(&self) -> Result<Vec<Service>, ProviderError> {
        Ok(self.document.services.iter().map(Service::new).collect())
    }

    async fn list_regions(&self, service: &str) -> Result<Vec<Region>, ProviderError> {
        self.ensure_service(service)?;
        Ok(self
            .document
            .regions
            .get(service)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_zones(&self, service: &str, region: &str) -> Result<Vec<Zone>, ProviderError> {
        self.ensure_service(service)?;
        Ok(self.document.zones.get(region).cloned().unwrap_or_default())
    }

    async fn list_instance_types(
        &self,
        service: &str,
        region: &str,
    ) -> Result<Vec<InstanceType>, ProviderError> {
        self.ensure_service(service)?;
        self.document
            .instance_types
            .get(region)
            .cloned()
            .ok_or_else(|| self.not_found(format!("instance types in {}", region)))
    }

    async fn get_price(
        &self,
        service: &str,
        region: &str,
        zone: Option<&str>,
        instance_type: &str,
        model: PriceModel,
    ) -> Result<Price, ProviderError> {
        self.ensure_service(service)?;

        // An exact zone match wins over a region-wide line.
        let candidates = self.document.prices.iter().filter(|p| {
            p.region == region && p.instance_type == instance_type && p.model == model
        });
        let mut fallback: Option<&SnapshotPrice> = None;
        for line in candidates {
            match (line.zone.as_deref(), zone) {
                (Some(a), Some(b)) if a == b => {
                    return Ok(Price::new(model, line.value, line.currency.clone()));
                }
                (None, _) => fallback = Some(line),
                _ => {}
            }
        }

        fallback
            .map(|line| Price::new(model, line.value, line.currency.clone()))
            .ok_or_else(|| {
                self.not_found(format!(
                    "{} price of {} in {}/{}",
                    model,
                    instance_type,
                    region,
                    zone.unwrap_or("-")
                ))
            })
    }

    async fn get_attributes(
        &self,
        service: &str,
        region: &str,
        instance_type: &str,
    ) -> Result<Attributes, ProviderError> {
        self.list_instance_types(service, region)
            .await?
            .into_iter()
            .find(|it| it.name == instance_type)
            .map(|it| it.attributes)
            .ok_or_else(|| self.not_found(format!("instance type {} in {}", instance_type, region)))
    }
}
