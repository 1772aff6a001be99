//! # MK-02: Driver Registry
//!
//! A secondary, independently-lifecycled registry for lower-level driver
//! components.
//!
//! ## Responsibilities
//!
//! - Registration with duplicate / unknown id errors returned to the caller
//! - Lookup by id, by concrete Rust type, by state and by name substring
//! - Watching each driver's state channel; `Error` and `Running`
//!   transitions are logged specially and every transition is published as
//!   `KernelEvent::DriverStateChanged`
//! - Concurrent health validation with per-driver fault isolation
//!
//! ## Example
//!
//! ```rust,ignore
//! let registry = DriverRegistry::new().with_event_bus(bus.clone());
//! registry.register(Arc::new(UartDriver::new("uart0")))?;
//!
//! let uarts: Vec<Arc<UartDriver>> = registry.get_by_type::<UartDriver>();
//! let report = registry.validate_health().await;
//! ```

pub mod config;
pub mod domain;
pub mod service;

pub use config::RegistryConfig;
pub use domain::{
    Driver, DriverError, DriverHandle, DriverHealth, HealthValidationReport, RegistryError,
};
pub use service::DriverRegistry;
