//! Engine configuration.
//!
//! Built by the server from environment variables and validated once at
//! startup; the engine never re-reads it.

use std::collections::BTreeMap;
use std::time::Duration;

use cloudinfo_provider::FetchLimits;

use crate::errors::ConfigError;

/// Default interval between scheduled scrape passes.
pub const DEFAULT_SCRAPE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
/// Default number of buffered events per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Settings of a single provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderSettings {
    pub enabled: bool,
    pub limits: FetchLimits,
    /// Fixed service list; when set the provider is never asked for its
    /// services.
    pub services: Option<Vec<String>>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            limits: FetchLimits::default(),
            services: None,
        }
    }
}

/// Configuration for the whole engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// One interval shared by every provider.
    pub scrape_interval: Duration,
    /// Delay before the first scheduled pass.
    pub initial_delay: Duration,
    pub event_capacity: usize,
    pub providers: BTreeMap<String, ProviderSettings>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scrape_interval: DEFAULT_SCRAPE_INTERVAL,
            initial_delay: Duration::ZERO,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            providers: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn with_provider(mut self, id: impl Into<String>, settings: ProviderSettings) -> Self {
        self.providers.insert(id.into(), settings);
        self
    }

    pub fn provider(&self, id: &str) -> Option<&ProviderSettings> {
        self.providers.get(id)
    }

    /// Enabled providers in id order.
    pub fn enabled_providers(&self) -> impl Iterator<Item = (&str, &ProviderSettings)> {
        self.providers
            .iter()
            .filter(|(_, settings)| settings.enabled)
            .map(|(id, settings)| (id.as_str(), settings))
    }

    /// Rejects values the driver cannot run with. Disabled providers are
    /// checked too so that enabling one later cannot surprise anyone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scrape_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroEventCapacity);
        }

        for (id, settings) in &self.providers {
            if settings.limits.max_concurrency == 0 {
                return Err(ConfigError::ZeroConcurrency(id.clone()));
            }
            if settings.limits.fetch_timeout.is_zero() {
                return Err(ConfigError::ZeroTimeout(id.clone()));
            }
            if settings.limits.requests_per_minute == 0 {
                return Err(ConfigError::ZeroRate(id.clone()));
            }
            if let Some(services) = &settings.services {
                if services.iter().any(|s| s.trim().is_empty()) {
                    return Err(ConfigError::Provider(
                        id.clone(),
                        "service names must not be empty".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}
