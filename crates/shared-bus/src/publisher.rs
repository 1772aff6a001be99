//! # Event Publisher
//!
//! Sending end of the kernel event bus.

use crate::events::{EventFilter, KernelEvent};
use crate::subscriber::{Subscription, TopicCounts};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Anything kernel events can be published to.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Returns how many live receivers the event reached.
    async fn publish(&self, event: KernelEvent) -> usize;

    /// Events attempted since creation, delivered or not.
    fn events_published(&self) -> u64;
}

/// Process-local bus over a `tokio::sync::broadcast` channel.
///
/// Every subscriber owns a receiver; filtering happens on the receiving
/// side. Dropping the bus closes all subscriptions.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<KernelEvent>,
    counts: TopicCounts,
    published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus whose subscribers may fall `capacity` events behind before
    /// skipping. Zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            counts: TopicCounts::default(),
            published: AtomicU64::new(0),
            capacity,
        }
    }

    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let topic_key = format!("{:?}", filter.topics);
        *self.counts.write().entry(topic_key.clone()).or_insert(0) += 1;
        debug!(topics = ?filter.topics, "[Bus] Subscription created");

        Subscription::new(self.sender.subscribe(), filter, self.counts.clone(), topic_key)
    }

    /// Publish from synchronous code. Same semantics as [`EventPublisher::publish`].
    pub fn send(&self, event: KernelEvent) -> usize {
        let name = event.name();
        self.published.fetch_add(1, Ordering::Relaxed);

        // No receivers is normal: kernel events are informational
        let receivers = self.sender.send(event).unwrap_or(0);
        trace!(event = name, receivers, "[Bus] Event published");
        receivers
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Number of live subscriptions per topic key.
    #[must_use]
    pub fn subscriptions_by_topic(&self) -> HashMap<String, usize> {
        self.counts.read().clone()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: KernelEvent) -> usize {
        self.send(event)
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
