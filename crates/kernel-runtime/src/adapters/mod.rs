//! # Adapter Implementations
//!
//! Concrete implementations of ports declared by other crates:
//!
//! - [`EngineMonitorSource`] implements the monitor's `EngineHealthSource`
//!   on top of a [`KernelEngine`](crate::KernelEngine)
//! - [`InMemoryDocumentStore`] implements the `DocumentStore` persistence
//!   boundary for modules that need storage

pub mod document_store;
pub mod monitor_source;

pub use document_store::InMemoryDocumentStore;
pub use monitor_source::EngineMonitorSource;
