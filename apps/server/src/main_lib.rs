use std::sync::Arc;

use anyhow::Context;
use cloudinfo_core::provider::{ProviderRegistry, SnapshotProvider};
use cloudinfo_core::{CloudInfoStore, Engine, InMemoryStore};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::management;

pub fn init_tracing() {
    let log_format = std::env::var("CLOUDINFO_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Registers one snapshot provider per enabled provider.
pub fn build_registry(config: &Config) -> anyhow::Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    for (id, settings) in config.engine.enabled_providers() {
        let path = config
            .snapshots
            .get(id)
            .with_context(|| format!("no snapshot configured for provider '{}'", id))?;
        let provider = SnapshotProvider::from_path(id, path)
            .with_context(|| format!("failed to load provider '{}' from {}", id, path.display()))?
            .with_limits(settings.limits.clone());
        registry.register_with_limits(Arc::new(provider), settings.limits.clone());
    }

    if registry.is_empty() {
        warn!("Every configured provider is disabled");
    }
    Ok(registry)
}

pub fn build_engine(config: &Config) -> anyhow::Result<Engine> {
    let registry = build_registry(config)?;
    let store: Arc<dyn CloudInfoStore> = Arc::new(InMemoryStore::new());
    Ok(Engine::new(&config.engine, registry, store)?)
}

/// Runs the engine until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let engine = build_engine(&config)?;

    let renew = config.renew_on_start.then(|| engine.driver().clone());
    let (shutdown, shutdown_rx) = watch::channel(false);
    let listener = management::spawn_listener(engine.events().subscribe(), renew, shutdown_rx);

    let loaded = engine.bootstrap().await;
    if loaded.is_empty() {
        warn!("No provider loaded its services, nothing will be scraped");
    }
    let handle = engine.start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown requested, waiting for the running scrape pass");

    engine.shutdown(handle).await?;
    let _ = shutdown.send(true);
    let pass = engine.metrics().pass();
    info!(
        passes = pass.passes,
        load_failures = pass.load_failures,
        services = engine.metrics().services().len(),
        "Scrape metrics at shutdown"
    );
    drop(engine);
    if let Err(e) = listener.await {
        warn!("Management listener ended abnormally: {}", e);
    }

    info!("Bye");
    Ok(())
}
