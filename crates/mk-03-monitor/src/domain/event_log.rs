//! Bounded, thread-safe event log.
//!
//! A `VecDeque` ring under its own mutex. Once `capacity` is reached each
//! append evicts the oldest entry. Readers get clones; the log is never
//! mutated by a read.

use parking_lot::Mutex;
use std::collections::VecDeque;

use super::event::MonitorEvent;

/// Default number of retained events.
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

#[derive(Debug)]
pub struct EventLog {
    capacity: usize,
    events: Mutex<VecDeque<MonitorEvent>>,
}

impl EventLog {
    /// Create a log holding at most `capacity` events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append an event. Returns the evicted event, if any.
    pub fn push(&self, event: MonitorEvent) -> Option<MonitorEvent> {
        let mut events = self.events.lock();
        let evicted = if events.len() >= self.capacity {
            events.pop_front()
        } else {
            None
        };
        events.push_back(event);
        evicted
    }

    /// The `n` most recent events, newest first.
    pub fn recent(&self, n: usize) -> Vec<MonitorEvent> {
        self.events.lock().iter().rev().take(n).cloned().collect()
    }

    /// Every retained event, oldest first.
    pub fn all(&self) -> Vec<MonitorEvent> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
