//! Refresh status of each (provider, service) pair.
//!
//! Statuses live in the store next to the data they describe, so anything
//! holding the store can report how fresh the cache is.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{FetchFailure, Result};
use crate::store::{CloudInfoStore, KeyPrefix, Namespace, StoreKey, TypedStoreExt};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    pub provider: String,
    pub service: String,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<FetchFailure>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub in_progress: bool,
    pub consecutive_failures: u32,
}

impl RefreshStatus {
    pub fn new(provider: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            service: service.into(),
            last_attempt: None,
            last_success: None,
            last_error: None,
            last_error_at: None,
            in_progress: false,
            consecutive_failures: 0,
        }
    }

    /// True when the pair never succeeded or last succeeded more than
    /// `max_age` before `now`.
    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match self.last_success {
            Some(at) => now - at > max_age,
            None => true,
        }
    }

    fn begin(&mut self, at: DateTime<Utc>) {
        self.last_attempt = Some(at);
        self.in_progress = true;
    }

    fn succeed(&mut self, at: DateTime<Utc>) {
        self.last_success = Some(at);
        self.in_progress = false;
        self.consecutive_failures = 0;
    }

    // The last error is kept after a success so operators can still see it.
    fn fail(&mut self, at: DateTime<Utc>, failure: FetchFailure) {
        self.last_error = Some(failure);
        self.last_error_at = Some(at);
        self.in_progress = false;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }
}

/// Reads and updates refresh statuses in the store.
///
/// Updates are read-modify-write without locking. The scraping driver runs
/// one pass at a time, so a pair never has two refreshes writing at once.
#[derive(Clone)]
pub struct StatusBook {
    store: Arc<dyn CloudInfoStore>,
}

impl StatusBook {
    pub fn new(store: Arc<dyn CloudInfoStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, provider: &str, service: &str) -> Result<Option<RefreshStatus>> {
        Ok(self
            .store
            .get_value::<RefreshStatus>(&StoreKey::status(provider, service))
            .await?
            .map(|(status, _)| status))
    }

    /// Every known status, sorted by provider then service.
    pub async fn all(&self) -> Result<Vec<RefreshStatus>> {
        let keys = self
            .store
            .list_keys(&KeyPrefix::namespace(Namespace::Status))
            .await?;

        let mut statuses = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some((status, _)) = self.store.get_value::<RefreshStatus>(&key).await? {
                statuses.push(status);
            }
        }
        Ok(statuses)
    }

    /// Creates an empty status for a newly catalogued pair.
    pub async fn ensure(&self, provider: &str, service: &str) -> Result<RefreshStatus> {
        self.update(provider, service, |_| {}).await
    }

    pub async fn begin_attempt(&self, provider: &str, service: &str) -> Result<RefreshStatus> {
        let now = Utc::now();
        self.update(provider, service, |status| status.begin(now)).await
    }

    pub async fn record_success(&self, provider: &str, service: &str) -> Result<RefreshStatus> {
        let now = Utc::now();
        self.update(provider, service, |status| status.succeed(now)).await
    }

    pub async fn record_failure(
        &self,
        provider: &str,
        service: &str,
        failure: FetchFailure,
    ) -> Result<RefreshStatus> {
        let now = Utc::now();
        self.update(provider, service, |status| status.fail(now, failure))
            .await
    }

    async fn update<F>(&self, provider: &str, service: &str, apply: F) -> Result<RefreshStatus>
    where
        F: FnOnce(&mut RefreshStatus) + Send,
    {
        let key = StoreKey::status(provider, service);
        let current = self.store.get_value::<RefreshStatus>(&key).await?;

        // Never stamp a status older than the one it replaces, or the
        // store would reject it after a backwards clock step.
        let (mut status, stamp) = match current {
            Some((status, written_at)) => (status, Utc::now().max(written_at)),
            None => (RefreshStatus::new(provider, service), Utc::now()),
        };
        apply(&mut status);

        self.store.put_value(&key, &status, stamp).await?;
        Ok(status)
    }
}
