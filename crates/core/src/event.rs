//! World signal bus: decoupled delivery of [`WorldEvent`]s.
//!
//! A world session publishes its signals here. Navigation goals, the event
//! reactor and the supervisor each hold a [`Subscription`]; dropping the
//! subscription releases the handler, so finished goals never leave stale
//! listeners behind.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::warn;

use crate::world::WorldEvent;

/// A broadcast-based event bus for world signals.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<WorldEvent>,
    next_subscription: AtomicU64,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Publish an event to all subscribers. Returns how many received it.
    pub fn publish(&self, event: WorldEvent) -> usize {
        // No subscribers is fine
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to receive events published from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            id: self.next_subscription.fetch_add(1, Ordering::Relaxed),
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// A live handle on the bus. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    receiver: broadcast::Receiver<WorldEvent>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event. `None` once the bus is gone.
    ///
    /// A lagging subscriber skips the events it missed and keeps going.
    pub async fn next(&mut self) -> Option<WorldEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(subscription = self.id, skipped, "Subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take an already-queued event without waiting.
    pub fn try_next(&mut self) -> Option<WorldEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(subscription = self.id, skipped, "Subscriber lagged, events dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
