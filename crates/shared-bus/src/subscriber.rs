//! # Event Subscriber
//!
//! Filtered receiving end of the kernel event bus.

use crate::events::{EventFilter, KernelEvent};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Event bus closed")]
    Closed,
}

/// Anything that hands out filtered subscriptions.
pub trait EventSubscriber: Send + Sync {
    fn subscribe(&self, filter: EventFilter) -> Subscription;
}

impl EventSubscriber for crate::publisher::InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        crate::publisher::InMemoryEventBus::subscribe(self, filter)
    }
}

/// Per-topic subscriber counts shared with the bus.
pub(crate) type TopicCounts = Arc<RwLock<HashMap<String, usize>>>;

/// Receiver that yields only events accepted by its filter.
///
/// Dropping it releases its slot in the bus's per-topic counts.
pub struct Subscription {
    receiver: broadcast::Receiver<KernelEvent>,
    filter: EventFilter,
    counts: TopicCounts,
    topic_key: String,
    lagged: u64,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<KernelEvent>,
        filter: EventFilter,
        counts: TopicCounts,
        topic_key: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            counts,
            topic_key,
            lagged: 0,
        }
    }

    /// Next matching event, or `None` once the bus is gone.
    ///
    /// Falling behind skips the overwritten events and adds them to
    /// [`Subscription::lagged`].
    pub async fn recv(&mut self) -> Option<KernelEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => self.skip(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking [`Subscription::recv`]. `Ok(None)` when nothing matching
    /// is queued.
    pub fn try_recv(&mut self) -> Result<Option<KernelEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => self.skip(skipped),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Events skipped so far because this subscriber fell behind.
    #[must_use]
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    fn skip(&mut self, skipped: u64) {
        self.lagged += skipped;
        debug!(skipped, total = self.lagged, "[Bus] Subscriber lagged");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut counts = self.counts.write();
        let remaining = counts.get_mut(&self.topic_key).map(|count| {
            *count = count.saturating_sub(1);
            *count
        });
        if remaining == Some(0) {
            counts.remove(&self.topic_key);
        }
        debug!(topic = %self.topic_key, "[Bus] Subscription dropped");
    }
}
