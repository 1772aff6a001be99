//! Monitor error types

use thiserror::Error;

/// Errors raised by collection cycles and configuration.
///
/// Collection errors never escape a background loop; they are logged and the
/// next cycle runs as scheduled.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MonitorError {
    /// No engine attached, or the engine has been dropped.
    #[error("Engine health source is unavailable")]
    SourceUnavailable,

    #[error("Process {0} not found")]
    ProcessNotFound(u32),

    #[error("Metrics conversion failed: {0}")]
    MetricsConversion(String),

    #[error("Invalid monitor configuration: {0}")]
    InvalidConfig(String),
}
