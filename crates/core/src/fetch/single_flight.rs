use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use log::debug;

use crate::errors::FetchFailure;
use crate::store::StoreKey;

type FlightResult<T> = Result<T, FetchFailure>;
type FlightTable<T> = Arc<Mutex<HashMap<StoreKey, Flight<T>>>>;

struct Flight<T: Clone> {
    id: u64,
    fetch: Shared<BoxFuture<'static, FlightResult<T>>>,
}

/// Collapses concurrent fetches of the same key into one.
///
/// The first caller for a key spawns the fetch on its own task; every
/// caller arriving while it runs awaits the same result. The fetch runs to
/// completion even when all callers give up, and the key is released as
/// soon as it completes, so the next call fetches again.
pub struct FetchCoordinator<T: Clone> {
    inflight: FlightTable<T>,
    next_id: AtomicU64,
    started: AtomicU64,
}

impl<T> Default for FetchCoordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
            started: AtomicU64::new(0),
        }
    }
}

// A panic while holding the lock cannot leave the map half-updated.
fn lock<T: Clone>(
    table: &Mutex<HashMap<StoreKey, Flight<T>>>,
) -> MutexGuard<'_, HashMap<StoreKey, Flight<T>>> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Releases a flight's key when its task ends, panics included. A newer
/// flight registered for the same key is left alone.
struct Release<T: Clone> {
    table: FlightTable<T>,
    key: StoreKey,
    id: u64,
}

impl<T: Clone> Drop for Release<T> {
    fn drop(&mut self) {
        let mut inflight = lock(&self.table);
        if inflight.get(&self.key).map(|flight| flight.id) == Some(self.id) {
            inflight.remove(&self.key);
        }
    }
}

impl<T> FetchCoordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `fetch` for `key` unless a fetch for it is already running, in
    /// which case `fetch` is dropped unpolled and the running one is awaited.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn run<F>(&self, key: &StoreKey, fetch: F) -> FlightResult<T>
    where
        F: Future<Output = FlightResult<T>> + Send + 'static,
    {
        let shared = {
            let mut inflight = lock(&self.inflight);
            match inflight.get(key) {
                Some(flight) => {
                    debug!("Joining in-flight fetch of {}", key);
                    flight.fetch.clone()
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let release = Release {
                        table: self.inflight.clone(),
                        key: key.clone(),
                        id,
                    };

                    // The table lock is held until the flight is registered,
                    // so the task cannot release the key before that.
                    let handle = tokio::spawn(async move {
                        let _release = release;
                        fetch.await
                    });

                    let shared = async move { handle.await.unwrap_or_else(|e| Err(e.into())) }
                        .boxed()
                        .shared();
                    inflight.insert(
                        key.clone(),
                        Flight {
                            id,
                            fetch: shared.clone(),
                        },
                    );
                    self.started.fetch_add(1, Ordering::Relaxed);
                    shared
                }
            }
        };

        shared.await
    }

    pub fn is_in_flight(&self, key: &StoreKey) -> bool {
        lock(&self.inflight).contains_key(key)
    }

    pub fn in_flight(&self) -> usize {
        lock(&self.inflight).len()
    }

    /// Number of fetches actually started, joined callers excluded.
    pub fn fetches_started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }
}
