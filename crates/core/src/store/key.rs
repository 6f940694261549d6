use std::fmt;

use cloudinfo_provider::PriceModel;
use serde::{Deserialize, Serialize};

/// Zone segment used for prices that are not zonal (on-demand).
pub const REGIONAL_ZONE: &str = "-";

/// Top-level grouping of store keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Services,
    Regions,
    Zones,
    InstanceTypes,
    Attributes,
    Prices,
    Status,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Services => "services",
            Self::Regions => "regions",
            Self::Zones => "zones",
            Self::InstanceTypes => "instance_types",
            Self::Attributes => "attributes",
            Self::Prices => "prices",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one cached datum.
///
/// The first segment is always the provider id. Keys sort by namespace,
/// then segment by segment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    namespace: Namespace,
    segments: Vec<String>,
}

impl StoreKey {
    fn build(namespace: Namespace, segments: &[&str]) -> Self {
        Self {
            namespace,
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Service catalog of a provider.
    pub fn services(provider: &str) -> Self {
        Self::build(Namespace::Services, &[provider])
    }

    pub fn regions(provider: &str, service: &str) -> Self {
        Self::build(Namespace::Regions, &[provider, service])
    }

    pub fn zones(provider: &str, service: &str, region: &str) -> Self {
        Self::build(Namespace::Zones, &[provider, service, region])
    }

    pub fn instance_types(provider: &str, service: &str, region: &str) -> Self {
        Self::build(Namespace::InstanceTypes, &[provider, service, region])
    }

    pub fn attributes(provider: &str, service: &str, region: &str, instance_type: &str) -> Self {
        Self::build(
            Namespace::Attributes,
            &[provider, service, region, instance_type],
        )
    }

    /// Price of an instance type. `zone` is `None` for regional prices.
    pub fn price(
        provider: &str,
        service: &str,
        region: &str,
        zone: Option<&str>,
        instance_type: &str,
        model: PriceModel,
    ) -> Self {
        Self::build(
            Namespace::Prices,
            &[
                provider,
                service,
                region,
                zone.unwrap_or(REGIONAL_ZONE),
                instance_type,
                model.as_str(),
            ],
        )
    }

    /// Refresh status of a (provider, service) pair.
    pub fn status(provider: &str, service: &str) -> Self {
        Self::build(Namespace::Status, &[provider, service])
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn provider(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or_default()
    }

    pub fn service(&self) -> Option<&str> {
        self.segments.get(1).map(String::as_str)
    }

    pub fn starts_with(&self, prefix: &KeyPrefix) -> bool {
        if let Some(namespace) = prefix.namespace {
            if namespace != self.namespace {
                return false;
            }
        }
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace.as_str())?;
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

/// Prefix used to enumerate keys.
///
/// Segments only constrain the key when a namespace is set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyPrefix {
    namespace: Option<Namespace>,
    segments: Vec<String>,
}

impl KeyPrefix {
    /// Matches every key.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn namespace(namespace: Namespace) -> Self {
        Self {
            namespace: Some(namespace),
            segments: Vec::new(),
        }
    }

    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        if self.namespace.is_some() {
            self.segments.push(segment.into());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_segments() {
        let key = StoreKey::attributes("amazon", "compute", "eu-west-1", "m5.large");
        assert_eq!(key.to_string(), "attributes/amazon/compute/eu-west-1/m5.large");
        assert_eq!(key.provider(), "amazon");
        assert_eq!(key.service(), Some("compute"));
    }

    #[test]
    fn test_regional_price_uses_placeholder_zone() {
        let key = StoreKey::price("google", "gke", "us-east1", None, "n1-standard-2", PriceModel::OnDemand);
        assert_eq!(
            key.to_string(),
            "prices/google/gke/us-east1/-/n1-standard-2/on_demand"
        );
    }

    #[test]
    fn test_prefix_matching() {
        let key = StoreKey::zones("azure", "aks", "westeurope");

        assert!(key.starts_with(&KeyPrefix::all()));
        assert!(key.starts_with(&KeyPrefix::namespace(Namespace::Zones)));
        assert!(key.starts_with(&KeyPrefix::namespace(Namespace::Zones).segment("azure")));
        assert!(!key.starts_with(&KeyPrefix::namespace(Namespace::Zones).segment("amazon")));
        assert!(!key.starts_with(&KeyPrefix::namespace(Namespace::Regions)));
    }

    #[test]
    fn test_keys_sort_by_namespace_then_segments() {
        let mut keys = vec![
            StoreKey::regions("google", "compute"),
            StoreKey::services("google"),
            StoreKey::regions("amazon", "compute"),
        ];
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["services/google", "regions/amazon/compute", "regions/google/compute"]
        );
    }
}
