//! KitchenHub - 按厨房分发订单变更
//!
//! ```text
//! KitchenManager (after commit)
//!       │ publish(restaurant_id, KitchenEvent)
//!       ▼
//! KitchenHub
//!   └── kitchens: restaurant_id → KitchenTopic
//!         └── subscribers: subscriber_id → mpsc::Sender<KitchenEvent>
//!               │ try_send (never waits)
//!               ▼
//!         Display WS session
//! ```
//!
//! Delivery is at-most-once. A subscriber whose buffer is full misses the
//! event and catches up on the next poll; a subscriber whose receiver is gone
//! is pruned on the next publish.

use dashmap::DashMap;
use shared::kitchen::KitchenEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Per-subscriber buffer
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// 单个厨房的订阅者
#[derive(Default)]
struct KitchenTopic {
    /// subscriber_id → sender
    subscribers: DashMap<String, mpsc::Sender<KitchenEvent>>,
}

/// 全局厨房 hub
#[derive(Clone)]
pub struct KitchenHub {
    /// restaurant_id → KitchenTopic
    kitchens: Arc<DashMap<i64, KitchenTopic>>,
    buffer: usize,
}

impl std::fmt::Debug for KitchenHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KitchenHub")
            .field("kitchens", &self.kitchens.len())
            .field("buffer", &self.buffer)
            .finish()
    }
}

impl Default for KitchenHub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

impl KitchenHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            kitchens: Arc::new(DashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// JoinKitchen: register a subscriber and hand back its event stream
    ///
    /// Joining again with the same id replaces the previous channel; the old
    /// receiver then sees the end of its stream.
    pub fn join(&self, kitchen_id: i64, subscriber_id: &str) -> mpsc::Receiver<KitchenEvent> {
        let (tx, rx) = mpsc::channel(self.buffer);
        // Insert while holding the topic entry so a concurrent leave cannot
        // drop the topic between lookup and insert.
        let topic = self.kitchens.entry(kitchen_id).or_default();
        let replaced = topic
            .subscribers
            .insert(subscriber_id.to_string(), tx)
            .is_some();
        drop(topic);

        tracing::debug!(
            kitchen_id,
            subscriber_id = %subscriber_id,
            replaced,
            "Subscriber joined kitchen"
        );
        rx
    }

    /// LeaveKitchen: no delivery to the subscriber after this returns
    pub fn leave(&self, kitchen_id: i64, subscriber_id: &str) -> bool {
        let removed = self
            .kitchens
            .get(&kitchen_id)
            .map(|topic| topic.subscribers.remove(subscriber_id).is_some())
            .unwrap_or(false);
        self.drop_if_empty(kitchen_id);

        if removed {
            tracing::debug!(kitchen_id, subscriber_id = %subscriber_id, "Subscriber left kitchen");
        }
        removed
    }

    /// Remove the subscriber only if its receiver is gone
    ///
    /// Used when a session ends: if the same display already re-joined, the
    /// newer channel is still open and stays registered.
    pub fn release(&self, kitchen_id: i64, subscriber_id: &str) -> bool {
        let removed = self
            .kitchens
            .get(&kitchen_id)
            .map(|topic| {
                topic
                    .subscribers
                    .remove_if(subscriber_id, |_, tx| tx.is_closed())
                    .is_some()
            })
            .unwrap_or(false);
        self.drop_if_empty(kitchen_id);
        removed
    }

    /// Fan an event out to every subscriber of a kitchen
    ///
    /// Never waits. Returns how many subscribers accepted the event.
    pub fn publish(&self, kitchen_id: i64, event: KitchenEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        {
            let Some(topic) = self.kitchens.get(&kitchen_id) else {
                return 0;
            };
            for entry in topic.subscribers.iter() {
                match entry.value().try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::debug!(
                            kitchen_id,
                            subscriber_id = %entry.key(),
                            event = event.kind(),
                            "Subscriber buffer full, event dropped"
                        );
                    }
                    Err(TrySendError::Closed(_)) => closed.push(entry.key().clone()),
                }
            }
            for subscriber_id in &closed {
                topic
                    .subscribers
                    .remove_if(subscriber_id, |_, tx| tx.is_closed());
            }
        }

        if !closed.is_empty() {
            tracing::debug!(kitchen_id, pruned = closed.len(), "Pruned closed subscribers");
            self.drop_if_empty(kitchen_id);
        }
        delivered
    }

    /// Current subscribers of a kitchen
    pub fn subscriber_count(&self, kitchen_id: i64) -> usize {
        self.kitchens
            .get(&kitchen_id)
            .map(|t| t.subscribers.len())
            .unwrap_or(0)
    }

    /// Kitchens with at least one subscriber
    pub fn kitchen_count(&self) -> usize {
        self.kitchens.len()
    }

    fn drop_if_empty(&self, kitchen_id: i64) {
        self.kitchens
            .remove_if(&kitchen_id, |_, topic| topic.subscribers.is_empty());
    }
}
