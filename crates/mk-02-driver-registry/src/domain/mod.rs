//! Domain module for the Driver Registry

pub mod driver;
pub mod errors;
pub mod report;

pub use driver::{Driver, DriverHandle, DriverHealth};
pub use errors::{DriverError, RegistryError};
pub use report::HealthValidationReport;
