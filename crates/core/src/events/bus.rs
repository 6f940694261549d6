use log::warn;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use super::CloudInfoEvent;

/// Broadcast bus shared by the engine's publishers.
///
/// Each subscriber has its own bounded buffer, so a slow subscriber never
/// blocks a publisher or another subscriber.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CloudInfoEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to events published from now on.
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            receiver: self.sender.subscribe(),
            missed: 0,
        }
    }

    /// Publishes to every current subscriber and returns how many there
    /// were. Publishing with no subscribers is not an error.
    pub fn publish(&self, event: CloudInfoEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiving side of an [`EventBus`] subscription.
pub struct EventSubscription {
    receiver: broadcast::Receiver<CloudInfoEvent>,
    missed: u64,
}

impl EventSubscription {
    /// Next event, skipping over any the subscriber lagged past.
    /// Returns `None` once every bus handle is gone.
    pub async fn recv(&mut self) -> Option<CloudInfoEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<CloudInfoEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Events dropped because this subscriber fell behind.
    pub fn missed(&self) -> u64 {
        self.missed
    }

    fn record_lag(&mut self, skipped: u64) {
        self.missed += skipped;
        warn!("Event subscriber lagged, {} events dropped", skipped);
    }
}
