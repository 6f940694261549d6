//! Scrape scheduling.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use cloudinfo_provider::{ProviderErrorKind, ProviderRegistry};
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use super::report::{PairOutcome, ScrapeReport};
use super::scope::{RenewQueue, RenewScope};
use super::task::ServiceScraper;
use crate::config::EngineConfig;
use crate::errors::{FetchFailure, Result};
use crate::events::{CloudInfoEvent, EventBus, RefreshOutcome};
use crate::fetch::KeyFetcher;
use crate::services::ServiceCatalog;
use crate::status::StatusBook;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    Idle,
    Scraping,
}

struct DriverInner {
    interval: Duration,
    initial_delay: Duration,
    registry: Arc<ProviderRegistry>,
    scraper: ServiceScraper,
    catalog: ServiceCatalog,
    status: StatusBook,
    events: EventBus,
    active_passes: AtomicUsize,
    pass_lock: tokio::sync::Mutex<()>,
    renewals: Mutex<RenewQueue>,
    wake: Notify,
}

/// Keeps the store warm by refreshing every catalogued (provider, service)
/// pair on a fixed interval, and on demand through [`renew`](Self::renew).
///
/// Each pair is refreshed by its own task; pairs never wait on each other
/// except through their provider's concurrency ceiling.
#[derive(Clone)]
pub struct ScrapingDriver {
    inner: Arc<DriverInner>,
}

impl ScrapingDriver {
    pub fn new(config: &EngineConfig, fetcher: KeyFetcher, events: EventBus) -> Self {
        let store = fetcher.store().clone();
        Self {
            inner: Arc::new(DriverInner {
                interval: config.scrape_interval,
                initial_delay: config.initial_delay,
                registry: fetcher.registry().clone(),
                scraper: ServiceScraper::new(fetcher),
                catalog: ServiceCatalog::new(store.clone()),
                status: StatusBook::new(store),
                events,
                active_passes: AtomicUsize::new(0),
                pass_lock: tokio::sync::Mutex::new(()),
                renewals: Mutex::new(RenewQueue::default()),
                wake: Notify::new(),
            }),
        }
    }

    pub fn state(&self) -> DriverState {
        if self.inner.active_passes.load(Ordering::SeqCst) > 0 {
            DriverState::Scraping
        } else {
            DriverState::Idle
        }
    }

    /// Requests an out-of-schedule refresh of `scope`.
    ///
    /// Runs as soon as the driver is idle. Returns false when an already
    /// pending renewal covers the scope.
    pub fn renew(&self, scope: RenewScope) -> bool {
        let queued = self.inner.renewals().push(scope.clone());
        if queued {
            info!("Renewal of {} requested", scope);
            self.inner.wake.notify_one();
        } else {
            debug!("Renewal of {} coalesced with a pending one", scope);
        }
        queued
    }

    /// Spawns the scheduling loop.
    ///
    /// The first pass starts after the configured initial delay. Dropping
    /// the handle stops the loop the same way [`ScrapingHandle::stop`] does,
    /// without waiting for it.
    pub fn start(&self) -> ScrapingHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.inner.clone().run(stop_rx));
        ScrapingHandle {
            driver: self.clone(),
            stop: stop_tx,
            task,
        }
    }

    /// Runs one pass over `scope` and waits for every task. A pass already
    /// running, scheduled or not, finishes before this one starts.
    pub async fn run_pass(&self, scope: RenewScope) -> Result<ScrapeReport> {
        self.inner.run_pass(scope).await
    }
}

/// Control handle of a running [`ScrapingDriver`].
pub struct ScrapingHandle {
    driver: ScrapingDriver,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ScrapingHandle {
    pub fn driver(&self) -> &ScrapingDriver {
        &self.driver
    }

    pub fn renew(&self, scope: RenewScope) -> bool {
        self.driver.renew(scope)
    }

    pub fn state(&self) -> DriverState {
        self.driver.state()
    }

    /// Stops scheduling. A pass already running finishes first; scheduled
    /// and pending passes never start.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            error!("Scraping loop ended abnormally: {}", e);
        }
    }
}

/// Marks the driver as scraping while alive.
struct PassGuard<'a>(&'a AtomicUsize);

impl<'a> PassGuard<'a> {
    fn enter(active: &'a AtomicUsize) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(active)
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DriverInner {
    fn renewals(&self) -> MutexGuard<'_, RenewQueue> {
        self.renewals
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_renewals(&self) -> Vec<RenewScope> {
        self.renewals().drain()
    }

    async fn run(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        info!(
            "Scraping driver started (interval {:?}, first pass in {:?})",
            self.interval, self.initial_delay
        );
        let mut next_tick = Instant::now() + self.initial_delay;

        'schedule: loop {
            let mut scopes = tokio::select! {
                biased;
                _ = stop.changed() => break,
                _ = tokio::time::sleep_until(next_tick) => {
                    next_tick += self.interval;
                    vec![RenewScope::All]
                }
                _ = self.wake.notified() => self.take_renewals(),
            };

            // Renewals requested during a pass run right after it.
            while !scopes.is_empty() {
                for scope in scopes {
                    if *stop.borrow() {
                        break 'schedule;
                    }
                    if let Err(e) = self.run_pass(scope.clone()).await {
                        error!("Scrape pass over {} failed: {}", scope, e);
                    }
                }
                scopes = self.take_renewals();
            }

            // Ticks that fell due while scraping are skipped.
            let now = Instant::now();
            let mut skipped = 0;
            while next_tick <= now {
                next_tick += self.interval;
                skipped += 1;
            }
            if skipped > 0 {
                debug!("Skipped {} scheduled passes that fell due while scraping", skipped);
            }
        }

        info!("Scraping driver stopped");
    }

    async fn run_pass(self: &Arc<Self>, scope: RenewScope) -> Result<ScrapeReport> {
        let _exclusive = self.pass_lock.lock().await;
        let _guard = PassGuard::enter(&self.active_passes);
        let pass_id = Uuid::now_v7();
        let started_at = Utc::now();

        let pairs: Vec<(String, String)> = self
            .catalog
            .pairs()
            .await?
            .into_iter()
            .filter(|(provider, service)| {
                self.registry.contains(provider) && scope.matches(provider, service)
            })
            .collect();
        info!(
            "Scrape pass {} over {} started, {} services",
            pass_id,
            scope,
            pairs.len()
        );

        let tasks: Vec<_> = pairs
            .into_iter()
            .map(|(provider, service)| {
                let inner = self.clone();
                let (p, s) = (provider.clone(), service.clone());
                let task =
                    tokio::spawn(async move { inner.refresh_pair(pass_id, &p, &s).await });
                (provider, service, task)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (provider, service, task) in tasks {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let reason = FetchFailure::new(
                        ProviderErrorKind::Provider,
                        format!("refresh task aborted: {}", e),
                    );
                    self.finish_pair(pass_id, &provider, &service, Err(reason))
                        .await
                }
            };
            outcomes.push(PairOutcome {
                provider,
                service,
                outcome,
            });
        }

        let report = ScrapeReport {
            pass_id,
            scope,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        info!(
            "Scrape pass {} finished: {} succeeded, {} failed",
            pass_id,
            report.succeeded(),
            report.failed()
        );
        self.events.publish(CloudInfoEvent::ScrapeCompleted {
            pass_id,
            succeeded: report.succeeded(),
            failed: report.failed(),
            started_at: report.started_at,
            finished_at: report.finished_at,
        });

        Ok(report)
    }

    async fn refresh_pair(&self, pass_id: Uuid, provider: &str, service: &str) -> RefreshOutcome {
        if let Err(e) = self.status.begin_attempt(provider, service).await {
            warn!("Failed to mark {}/{} in progress: {}", provider, service, e);
        }
        let result = self.scraper.scrape(provider, service).await;
        self.finish_pair(pass_id, provider, service, result).await
    }

    async fn finish_pair(
        &self,
        pass_id: Uuid,
        provider: &str,
        service: &str,
        result: std::result::Result<usize, FetchFailure>,
    ) -> RefreshOutcome {
        let (outcome, recorded) = match result {
            Ok(keys) => {
                debug!("Refreshed {}/{} ({} keys)", provider, service, keys);
                (
                    RefreshOutcome::Success { keys },
                    self.status.record_success(provider, service).await,
                )
            }
            Err(reason) => {
                warn!("Refreshing {}/{} failed: {}", provider, service, reason);
                (
                    RefreshOutcome::Failure {
                        reason: reason.clone(),
                    },
                    self.status.record_failure(provider, service, reason).await,
                )
            }
        };
        if let Err(e) = recorded {
            warn!("Failed to record status of {}/{}: {}", provider, service, e);
        }

        self.events.publish(CloudInfoEvent::service_refreshed(
            pass_id,
            provider,
            service,
            outcome.clone(),
        ));
        outcome
    }
}
