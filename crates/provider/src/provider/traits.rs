//! Cloud provider trait definitions.
//!
//! This module defines the core `CloudInfoProvider` trait that all
//! cloud vendors must implement.

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::models::{Attributes, InstanceType, Price, PriceModel, Region, Service, Zone};

use super::limits::FetchLimits;

/// Trait for cloud info providers.
///
/// Implement this trait to add support for a new cloud vendor. The engine
/// only calls these methods through the [`ProviderRegistry`](crate::ProviderRegistry),
/// which applies the provider's [`FetchLimits`].
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use cloudinfo_provider::{CloudInfoProvider, ProviderError, Region, Service};
///
/// struct MyCloud {
///     api_key: String,
/// }
///
/// #[async_trait]
/// impl CloudInfoProvider for MyCloud {
///     fn id(&self) -> &str {
///         "mycloud"
///     }
///
///     async fn list_services(&self) -> Result<Vec<Service>, ProviderError> {
///         Ok(vec![Service::new("compute")])
///     }
///
///     // ... implement the remaining operations
/// }
/// ```
#[async_trait]
pub trait CloudInfoProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Used as the first segment of every store key, in logs and in events.
    fn id(&self) -> &str;

    /// Default limits for this provider.
    ///
    /// Configuration may override them when the provider is registered.
    fn fetch_limits(&self) -> FetchLimits {
        FetchLimits::default()
    }

    /// Services this provider supports.
    async fn list_services(&self) -> Result<Vec<Service>, ProviderError>;

    /// Regions in which `service` is available.
    async fn list_regions(&self, service: &str) -> Result<Vec<Region>, ProviderError>;

    /// Availability zones of `region`.
    async fn list_zones(&self, service: &str, region: &str) -> Result<Vec<Zone>, ProviderError>;

    /// Instance types offered by `service` in `region`.
    async fn list_instance_types(
        &self,
        service: &str,
        region: &str,
    ) -> Result<Vec<InstanceType>, ProviderError>;

    /// Current price of an instance type.
    ///
    /// `zone` is only meaningful for zonal pricing models (spot); on-demand
    /// prices are requested with `None`.
    async fn get_price(
        &self,
        service: &str,
        region: &str,
        zone: Option<&str>,
        instance_type: &str,
        model: PriceModel,
    ) -> Result<Price, ProviderError>;

    /// Attributes of a single instance type.
    ///
    /// Default implementation looks the type up in
    /// [`list_instance_types`](Self::list_instance_types).
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
            .ok_or_else(|| {
                ProviderError::NotFound(format!(
                    "{}/{}/{}/{}",
                    self.id(),
                    service,
                    region,
                    instance_type
                ))
            })
    }
}
