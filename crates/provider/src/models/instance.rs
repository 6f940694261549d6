use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Number of virtual CPUs.
pub const ATTR_CPU: &str = "cpu";
/// Memory size in GiB.
pub const ATTR_MEMORY: &str = "memory";
/// Number of GPUs (0 when absent).
pub const ATTR_GPU: &str = "gpu";
/// Network performance class (low, medium, high, extra).
pub const ATTR_NETWORK: &str = "networkPerfCategory";

/// Attribute map of an instance type.
///
/// Keys are unique; iteration order is the key order and carries no meaning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces an attribute, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Parses an attribute as a number.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.trim().parse().ok())
    }

    pub fn cpu(&self) -> Option<f64> {
        self.get_f64(ATTR_CPU)
    }

    pub fn memory(&self) -> Option<f64> {
        self.get_f64(ATTR_MEMORY)
    }

    pub fn gpu(&self) -> Option<f64> {
        self.get_f64(ATTR_GPU)
    }

    pub fn network(&self) -> Option<&str> {
        self.get(ATTR_NETWORK)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// An instance type offered by a provider in one region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceType {
    /// Provider-side type name, e.g. `m5.large`.
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl InstanceType {
    pub fn new(name: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }
}
