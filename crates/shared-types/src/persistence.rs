//! # Persistence Collaborator Port
//!
//! The connection contract that storage-backed modules depend on. The
//! engine and scheduler never see store-specific details; modules hold an
//! `Arc<dyn DocumentStore>` and surface its errors as
//! [`ModuleError::Persistence`](crate::ModuleError::Persistence).

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::errors::PersistenceError;

/// Connection lifecycle of a document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open the connection. `Ok(false)` means the store declined without
    /// raising (e.g. already connecting elsewhere).
    async fn connect(&self) -> Result<bool, PersistenceError>;

    /// Close the connection. Calling it while disconnected is a no-op.
    async fn disconnect(&self) -> Result<(), PersistenceError>;

    /// Round-trip check against the server.
    async fn ping(&self) -> Result<bool, PersistenceError>;

    fn is_connected(&self) -> bool;

    /// Connection metadata (host, database, strategy, ...). Never contains
    /// credentials.
    fn connection_info(&self) -> BTreeMap<String, String>;
}
