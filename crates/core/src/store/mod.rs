//! Key-value store shared by the scraping driver and the caching facade.
//!
//! Every entry carries the time its fetch completed. A write older than
//! the entry it would replace is rejected, so the value of a key only ever
//! moves forward in time regardless of the order concurrent refreshes
//! finish in.

mod key;
mod memory;
mod typed;

pub use key::{KeyPrefix, Namespace, StoreKey, REGIONAL_ZONE};
pub use memory::InMemoryStore;
pub use typed::TypedStoreExt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// A stored value together with the completion time of the fetch that
/// produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub value: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
}

impl StoreEntry {
    pub fn new(value: serde_json::Value, fetched_at: DateTime<Utc>) -> Self {
        Self { value, fetched_at }
    }
}

/// Result of a [`CloudInfoStore::put`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    /// The key did not exist.
    Inserted,
    /// The value changed.
    Updated,
    /// Same value; only the timestamp moved forward.
    Unchanged,
    /// The stored entry is newer; nothing was written.
    Rejected,
}

impl PutOutcome {
    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// Storage backend for cached cloud info.
///
/// Writes to a single key are atomic: a reader sees either the previous
/// entry or the new one.
#[async_trait]
pub trait CloudInfoStore: Send + Sync {
    /// Stores `entry` unless the current entry for `key` is newer.
    async fn put(&self, key: &StoreKey, entry: StoreEntry) -> Result<PutOutcome, StoreError>;

    async fn get(&self, key: &StoreKey) -> Result<Option<StoreEntry>, StoreError>;

    /// Keys matching `prefix`, sorted.
    async fn list_keys(&self, prefix: &KeyPrefix) -> Result<Vec<StoreKey>, StoreError>;

    /// Releases the backend. Every later call fails with [`StoreError::Closed`].
    async fn close(&self) -> Result<(), StoreError>;
}
