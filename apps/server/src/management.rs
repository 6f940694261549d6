//! Management listener.
//!
//! Logs every engine event and, when asked to, queues a full renewal once
//! the first scrape pass has completed.

use cloudinfo_core::{CloudInfoEvent, EventSubscription, RefreshOutcome, RenewScope, ScrapingDriver};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spawns the listener. It runs until the event bus closes or `shutdown`
/// flips, whichever comes first.
pub fn spawn_listener(
    subscription: EventSubscription,
    renew_after_first_pass: Option<ScrapingDriver>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(listen(subscription, renew_after_first_pass, shutdown))
}

async fn listen(
    mut subscription: EventSubscription,
    mut renew: Option<ScrapingDriver>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            event = subscription.recv() => match event {
                Some(event) => event,
                None => {
                    debug!("Event bus closed, management listener stopped");
                    break;
                }
            },
            Ok(()) = shutdown.changed() => {
                // Events already published are still logged.
                while let Some(event) = subscription.try_recv() {
                    log_event(&event);
                }
                debug!("Shutdown requested, management listener stopped");
                break;
            }
        };
        log_event(&event);

        if matches!(event, CloudInfoEvent::ScrapeCompleted { .. }) {
            if let Some(driver) = renew.take() {
                info!("Renewing all providers after the first pass");
                driver.renew(RenewScope::All);
            }
        }
    }

    if subscription.missed() > 0 {
        warn!(
            "Management listener missed {} events while lagging",
            subscription.missed()
        );
    }
}

fn log_event(event: &CloudInfoEvent) {
    match event {
        CloudInfoEvent::ServicesLoaded { provider, services } => {
            info!(provider = %provider, count = services.len(), "Services loaded");
        }
        CloudInfoEvent::ServicesLoadFailed { provider, reason } => {
            warn!(provider = %provider, kind = %reason.kind, "Services could not be loaded: {}", reason.message);
        }
        CloudInfoEvent::ServiceRefreshed {
            provider,
            service,
            outcome,
            ..
        } => match outcome {
            RefreshOutcome::Success { keys } => {
                debug!(provider = %provider, service = %service, keys = *keys, "Service refreshed");
            }
            RefreshOutcome::Failure { reason } => {
                warn!(provider = %provider, service = %service, kind = %reason.kind, "Service refresh failed: {}", reason.message);
            }
        },
        CloudInfoEvent::ScrapeCompleted {
            pass_id,
            succeeded,
            failed,
            started_at,
            finished_at,
        } => {
            let elapsed = (*finished_at - *started_at).num_milliseconds();
            info!(
                pass_id = %pass_id,
                succeeded = *succeeded,
                failed = *failed,
                elapsed_ms = elapsed,
                "Scrape pass completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudinfo_core::provider::ProviderRegistry;
    use cloudinfo_core::{Engine, EngineConfig, InMemoryStore};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_listener_stops_when_bus_closes() {
        let engine = Engine::new(
            &EngineConfig::default(),
            ProviderRegistry::new(),
            Arc::new(InMemoryStore::new()),
        )
        .unwrap();
        let (_shutdown, shutdown_rx) = watch::channel(false);
        let listener = spawn_listener(engine.events().subscribe(), None, shutdown_rx);

        engine.driver().run_pass(RenewScope::All).await.unwrap();
        drop(engine);

        listener.await.unwrap();
    }

    #[tokio::test]
    async fn test_first_pass_queues_one_renewal() {
        let engine = Engine::new(
            &EngineConfig::default(),
            ProviderRegistry::new(),
            Arc::new(InMemoryStore::new()),
        )
        .unwrap();
        let mut observer = engine.events().subscribe();
        let (_shutdown, shutdown_rx) = watch::channel(false);
        let listener = spawn_listener(
            engine.events().subscribe(),
            Some(engine.driver().clone()),
            shutdown_rx,
        );

        engine.driver().run_pass(RenewScope::All).await.unwrap();
        observer.recv().await.unwrap();
        tokio::task::yield_now().await;

        // The renewal from the listener is already pending, so another
        // request for everything is coalesced into it.
        assert!(!engine.driver().renew(RenewScope::All));

        drop(engine);
        drop(observer);
        listener.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_listener_before_first_pass() {
        let engine = Engine::new(
            &EngineConfig::default(),
            ProviderRegistry::new(),
            Arc::new(InMemoryStore::new()),
        )
        .unwrap();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let listener = spawn_listener(
            engine.events().subscribe(),
            Some(engine.driver().clone()),
            shutdown_rx,
        );

        // The listener's driver clone keeps the bus open after this.
        drop(engine);
        shutdown.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(2), listener)
            .await
            .expect("listener ends on shutdown")
            .unwrap();
    }
}
