use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, info};

use super::{CloudInfoStore, KeyPrefix, PutOutcome, StoreEntry, StoreKey};
use crate::errors::StoreError;

/// Process-local store backed by a sharded concurrent map.
#[derive(Default)]
pub struct InMemoryStore {
    entries: DashMap<StoreKey, StoreEntry>,
    closed: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl CloudInfoStore for InMemoryStore {
    async fn put(&self, key: &StoreKey, entry: StoreEntry) -> Result<PutOutcome, StoreError> {
        self.ensure_open()?;

        // The shard lock is held for the whole compare-and-write.
        let outcome = match self.entries.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
                PutOutcome::Inserted
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get_mut();
                if entry.fetched_at < current.fetched_at {
                    debug!(
                        "Rejected stale write to {} ({} < {})",
                        key, entry.fetched_at, current.fetched_at
                    );
                    PutOutcome::Rejected
                } else if entry.value == current.value {
                    current.fetched_at = entry.fetched_at;
                    PutOutcome::Unchanged
                } else {
                    *current = entry;
                    PutOutcome::Updated
                }
            }
        };

        Ok(outcome)
    }

    async fn get(&self, key: &StoreKey) -> Result<Option<StoreEntry>, StoreError> {
        self.ensure_open()?;
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn list_keys(&self, prefix: &KeyPrefix) -> Result<Vec<StoreKey>, StoreError> {
        self.ensure_open()?;
        let mut keys: Vec<StoreKey> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Closed);
        }
        let count = self.entries.len();
        self.entries.clear();
        info!("In-memory store closed, dropped {} entries", count);
        Ok(())
    }
}
