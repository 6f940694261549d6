use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{CloudInfoStore, PutOutcome, StoreEntry, StoreKey};
use crate::errors::Result;

/// Typed access on top of any [`CloudInfoStore`].
#[async_trait]
pub trait TypedStoreExt: CloudInfoStore {
    async fn put_value<T>(
        &self,
        key: &StoreKey,
        value: &T,
        fetched_at: DateTime<Utc>,
    ) -> Result<PutOutcome>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_value(value)?;
        Ok(self.put(key, StoreEntry::new(value, fetched_at)).await?)
    }

    /// Reads and decodes a value. An entry that no longer decodes is
    /// reported as missing so that callers refetch it.
    async fn get_value<T>(&self, key: &StoreKey) -> Result<Option<(T, DateTime<Utc>)>>
    where
        T: DeserializeOwned + Send,
    {
        let Some(entry) = self.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_value(entry.value) {
            Ok(value) => Ok(Some((value, entry.fetched_at))),
            Err(e) => {
                warn!("Discarding undecodable entry at {}: {}", key, e);
                Ok(None)
            }
        }
    }
}

impl<S: CloudInfoStore + ?Sized> TypedStoreExt for S {}
