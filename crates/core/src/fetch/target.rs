use cloudinfo_provider::PriceModel;

use crate::store::StoreKey;

/// A key the engine knows how to fetch from a provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FetchTarget {
    Regions {
        provider: String,
        service: String,
    },
    Zones {
        provider: String,
        service: String,
        region: String,
    },
    InstanceTypes {
        provider: String,
        service: String,
        region: String,
    },
    Attributes {
        provider: String,
        service: String,
        region: String,
        instance_type: String,
    },
    Price {
        provider: String,
        service: String,
        region: String,
        zone: Option<String>,
        instance_type: String,
        model: PriceModel,
    },
}

impl FetchTarget {
    pub fn regions(provider: &str, service: &str) -> Self {
        Self::Regions {
            provider: provider.to_string(),
            service: service.to_string(),
        }
    }

    pub fn zones(provider: &str, service: &str, region: &str) -> Self {
        Self::Zones {
            provider: provider.to_string(),
            service: service.to_string(),
            region: region.to_string(),
        }
    }

    pub fn instance_types(provider: &str, service: &str, region: &str) -> Self {
        Self::InstanceTypes {
            provider: provider.to_string(),
            service: service.to_string(),
            region: region.to_string(),
        }
    }

    pub fn attributes(provider: &str, service: &str, region: &str, instance_type: &str) -> Self {
        Self::Attributes {
            provider: provider.to_string(),
            service: service.to_string(),
            region: region.to_string(),
            instance_type: instance_type.to_string(),
        }
    }

    pub fn price(
        provider: &str,
        service: &str,
        region: &str,
        zone: Option<&str>,
        instance_type: &str,
        model: PriceModel,
    ) -> Self {
        Self::Price {
            provider: provider.to_string(),
            service: service.to_string(),
            region: region.to_string(),
            zone: zone.map(str::to_string),
            instance_type: instance_type.to_string(),
            model,
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            Self::Regions { provider, .. }
            | Self::Zones { provider, .. }
            | Self::InstanceTypes { provider, .. }
            | Self::Attributes { provider, .. }
            | Self::Price { provider, .. } => provider,
        }
    }

    pub fn key(&self) -> StoreKey {
        match self {
            Self::Regions { provider, service } => StoreKey::regions(provider, service),
            Self::Zones {
                provider,
                service,
                region,
            } => StoreKey::zones(provider, service, region),
            Self::InstanceTypes {
                provider,
                service,
                region,
            } => StoreKey::instance_types(provider, service, region),
            Self::Attributes {
                provider,
                service,
                region,
                instance_type,
            } => StoreKey::attributes(provider, service, region, instance_type),
            Self::Price {
                provider,
                service,
                region,
                zone,
                instance_type,
                model,
            } => StoreKey::price(
                provider,
                service,
                region,
                zone.as_deref(),
                instance_type,
                *model,
            ),
        }
    }
}
