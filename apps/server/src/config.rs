use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use cloudinfo_core::config::DEFAULT_EVENT_CAPACITY;
use cloudinfo_core::provider::FetchLimits;
use cloudinfo_core::{EngineConfig, ProviderSettings};

const DEFAULT_SCRAPE_INTERVAL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug)]
pub struct Config {
    pub engine: EngineConfig,
    /// Snapshot file of each enabled provider.
    pub snapshots: BTreeMap<String, PathBuf>,
    /// Queue a full renewal as soon as the first pass completes.
    pub renew_on_start: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let provider_ids = env.list("CLOUDINFO_PROVIDERS");
        if provider_ids.is_empty() {
            bail!("CLOUDINFO_PROVIDERS must name at least one provider");
        }

        let mut engine = EngineConfig {
            scrape_interval: Duration::from_secs(
                env.parse("CLOUDINFO_SCRAPE_INTERVAL_SECS", DEFAULT_SCRAPE_INTERVAL_SECS)?,
            ),
            initial_delay: Duration::from_secs(env.parse("CLOUDINFO_INITIAL_DELAY_SECS", 0)?),
            event_capacity: env.parse("CLOUDINFO_EVENT_CAPACITY", DEFAULT_EVENT_CAPACITY)?,
            providers: BTreeMap::new(),
        };
        let mut snapshots = BTreeMap::new();

        for id in provider_ids {
            let prefix = format!("CLOUDINFO_{}", id.to_ascii_uppercase().replace('-', "_"));
            let var = |suffix: &str| format!("{}_{}", prefix, suffix);
            let defaults = FetchLimits::default();

            let settings = ProviderSettings {
                enabled: env.parse(&var("ENABLED"), true)?,
                limits: FetchLimits {
                    max_concurrency: env.parse(&var("MAX_CONCURRENCY"), defaults.max_concurrency)?,
                    requests_per_minute: env
                        .parse(&var("REQUESTS_PER_MINUTE"), defaults.requests_per_minute)?,
                    fetch_timeout: Duration::from_secs(env.parse(
                        &var("FETCH_TIMEOUT_SECS"),
                        defaults.fetch_timeout.as_secs(),
                    )?),
                },
                services: env.get(&var("SERVICES")).map(|_| env.list(&var("SERVICES"))),
            };

            if settings.enabled {
                let snapshot = env
                    .get(&var("SNAPSHOT"))
                    .ok_or_else(|| anyhow!("{} is required for provider '{}'", var("SNAPSHOT"), id))?;
                snapshots.insert(id.clone(), PathBuf::from(snapshot));
            }
            engine.providers.insert(id, settings);
        }

        engine.validate().context("invalid engine configuration")?;

        Ok(Self {
            engine,
            snapshots,
            renew_on_start: env.parse("CLOUDINFO_RENEW_ON_START", false)?,
        })
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parse<T>(&self, name: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow!("Invalid {}='{}': {}", name, raw, e)),
            None => Ok(default),
        }
    }

    fn list(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[
            ("CLOUDINFO_PROVIDERS", "amazon"),
            ("CLOUDINFO_AMAZON_SNAPSHOT", "/data/amazon.json"),
        ])
        .unwrap();

        assert_eq!(config.engine.scrape_interval, Duration::from_secs(86_400));
        assert_eq!(config.engine.initial_delay, Duration::ZERO);
        assert!(!config.renew_on_start);

        let amazon = config.engine.provider("amazon").unwrap();
        assert!(amazon.enabled);
        assert_eq!(amazon.limits, FetchLimits::default());
        assert!(amazon.services.is_none());
        assert_eq!(config.snapshots["amazon"], PathBuf::from("/data/amazon.json"));
    }

    #[test]
    fn test_per_provider_overrides() {
        let config = config(&[
            ("CLOUDINFO_PROVIDERS", "amazon, google-cloud"),
            ("CLOUDINFO_SCRAPE_INTERVAL_SECS", "600"),
            ("CLOUDINFO_AMAZON_SNAPSHOT", "amazon.json"),
            ("CLOUDINFO_AMAZON_MAX_CONCURRENCY", "2"),
            ("CLOUDINFO_AMAZON_SERVICES", "compute, eks"),
            ("CLOUDINFO_GOOGLE_CLOUD_ENABLED", "false"),
            ("CLOUDINFO_RENEW_ON_START", "true"),
        ])
        .unwrap();

        assert_eq!(config.engine.scrape_interval, Duration::from_secs(600));
        let amazon = config.engine.provider("amazon").unwrap();
        assert_eq!(amazon.limits.max_concurrency, 2);
        assert_eq!(
            amazon.services,
            Some(vec!["compute".to_string(), "eks".to_string()])
        );

        let google = config.engine.provider("google-cloud").unwrap();
        assert!(!google.enabled);
        assert!(!config.snapshots.contains_key("google-cloud"));
        assert!(config.renew_on_start);
    }

    #[test]
    fn test_missing_snapshot_is_rejected() {
        let err = config(&[("CLOUDINFO_PROVIDERS", "azure")]).unwrap_err();
        assert!(err.to_string().contains("CLOUDINFO_AZURE_SNAPSHOT"));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let result = config(&[
            ("CLOUDINFO_PROVIDERS", "azure"),
            ("CLOUDINFO_AZURE_SNAPSHOT", "azure.json"),
            ("CLOUDINFO_SCRAPE_INTERVAL_SECS", "0"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_garbage_number_is_rejected() {
        let err = config(&[
            ("CLOUDINFO_PROVIDERS", "azure"),
            ("CLOUDINFO_AZURE_SNAPSHOT", "azure.json"),
            ("CLOUDINFO_AZURE_MAX_CONCURRENCY", "lots"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("CLOUDINFO_AZURE_MAX_CONCURRENCY"));
    }

    #[test]
    fn test_no_providers_is_rejected() {
        assert!(config(&[]).is_err());
    }
}
