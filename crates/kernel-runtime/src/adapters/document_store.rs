//! In-process document store connection.
//!
//! Tracks connection state only; it stores nothing. Used by the host's demo
//! storage module and by tests that need a store which can be told to fail.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{DocumentStore, PersistenceError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub struct InMemoryDocumentStore {
    database: String,
    connected: AtomicBool,
    pings: AtomicU64,
    /// Returned by the next `connect` call, then cleared.
    injected_failure: Mutex<Option<PersistenceError>>,
}

impl InMemoryDocumentStore {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            connected: AtomicBool::new(false),
            pings: AtomicU64::new(0),
            injected_failure: Mutex::new(None),
        }
    }

    /// Make the next `connect` fail with `error`.
    pub fn fail_next_connect(&self, error: PersistenceError) {
        *self.injected_failure.lock() = Some(error);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn connect(&self) -> Result<bool, PersistenceError> {
        let injected = self.injected_failure.lock().take();
        if let Some(err) = injected {
            return Err(err);
        }
        Ok(!self.connected.swap(true, Ordering::SeqCst))
    }

    async fn disconnect(&self) -> Result<(), PersistenceError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> Result<bool, PersistenceError> {
        if !self.is_connected() {
            return Err(PersistenceError::Connection(format!(
                "{} is not connected",
                self.database
            )));
        }
        self.pings.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn connection_info(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("backend".to_string(), "memory".to_string()),
            ("database".to_string(), self.database.clone()),
            ("connected".to_string(), self.is_connected().to_string()),
            (
                "pings".to_string(),
                self.pings.load(Ordering::Relaxed).to_string(),
            ),
        ])
    }
}
