//! Error types for the Driver Registry

use shared_types::entities::DriverId;
use thiserror::Error;

/// Registry mutation errors. These indicate programmer error and are
/// always returned to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A driver with this id is already registered
    #[error("Driver already registered: {0}")]
    DuplicateDriver(DriverId),

    /// No driver with this id is registered
    #[error("Unknown driver: {0}")]
    UnknownDriver(DriverId),

    /// The registry has been shut down
    #[error("Driver registry is shut down")]
    RegistryClosed,
}

/// Errors raised by driver implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    /// The health probe itself failed (distinct from reporting unhealthy)
    #[error("Health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Driver failure: {0}")]
    Failed(String),
}
