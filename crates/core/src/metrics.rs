//! Scrape metrics, recorded from the event bus.
//!
//! [`ScrapeMetrics`] keeps per-(provider, service) refresh counters and a
//! summary of the latest scrape pass. It only reads events, so it never
//! slows a publisher down; exporting the numbers is left to the caller.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, warn};
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::events::{CloudInfoEvent, EventSubscription, RefreshOutcome};

/// Refresh counters of one (provider, service) pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetrics {
    pub successes: u64,
    pub failures: u64,
    /// Keys written by successful refreshes.
    pub keys_written: u64,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub last_succeeded: Option<bool>,
}

/// Summary of scrape passes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassMetrics {
    pub passes: u64,
    pub last_pass_id: Option<Uuid>,
    pub last_duration: Option<Duration>,
    pub last_succeeded: usize,
    pub last_failed: usize,
    /// Providers whose service enumeration failed.
    pub load_failures: u64,
}

#[derive(Default)]
struct MetricsInner {
    services: DashMap<(String, String), ServiceMetrics>,
    pass: Mutex<PassMetrics>,
}

#[derive(Clone, Default)]
pub struct ScrapeMetrics {
    inner: Arc<MetricsInner>,
}

impl ScrapeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn pass_mut(&self) -> MutexGuard<'_, PassMetrics> {
        self.inner
            .pass
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies one event to the counters.
    pub fn record(&self, event: &CloudInfoEvent) {
        match event {
            CloudInfoEvent::ServicesLoaded { .. } => {}
            CloudInfoEvent::ServicesLoadFailed { .. } => {
                self.pass_mut().load_failures += 1;
            }
            CloudInfoEvent::ServiceRefreshed {
                provider,
                service,
                outcome,
                finished_at,
                ..
            } => {
                let mut entry = self
                    .inner
                    .services
                    .entry((provider.clone(), service.clone()))
                    .or_default();
                match outcome {
                    RefreshOutcome::Success { keys } => {
                        entry.successes += 1;
                        entry.keys_written += *keys as u64;
                        entry.last_succeeded = Some(true);
                    }
                    RefreshOutcome::Failure { .. } => {
                        entry.failures += 1;
                        entry.last_succeeded = Some(false);
                    }
                }
                entry.last_refreshed_at = Some(*finished_at);
            }
            CloudInfoEvent::ScrapeCompleted {
                pass_id,
                succeeded,
                failed,
                started_at,
                finished_at,
            } => {
                let mut pass = self.pass_mut();
                pass.passes += 1;
                pass.last_pass_id = Some(*pass_id);
                pass.last_duration = Some((*finished_at - *started_at).to_std().unwrap_or_default());
                pass.last_succeeded = *succeeded;
                pass.last_failed = *failed;
            }
        }
    }

    /// Records every event from `subscription` until the bus closes.
    pub fn spawn_recorder(&self, mut subscription: EventSubscription) -> JoinHandle<()> {
        let metrics = self.clone();
        tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                metrics.record(&event);
            }
            if subscription.missed() > 0 {
                warn!(
                    "Metrics recorder missed {} events while lagging",
                    subscription.missed()
                );
            }
            debug!("Event bus closed, metrics recorder stopped");
        })
    }

    pub fn service(&self, provider: &str, service: &str) -> Option<ServiceMetrics> {
        self.inner
            .services
            .get(&(provider.to_string(), service.to_string()))
            .map(|entry| entry.clone())
    }

    /// Counters of every pair refreshed so far, sorted by pair.
    pub fn services(&self) -> BTreeMap<(String, String), ServiceMetrics> {
        self.inner
            .services
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn pass(&self) -> PassMetrics {
        self.pass_mut().clone()
    }
}
