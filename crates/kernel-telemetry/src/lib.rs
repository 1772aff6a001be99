//! # Kernel Telemetry
//!
//! Logging and metrics for the microkernel.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kernel_telemetry::{TelemetryConfig, init_telemetry};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(config).expect("Failed to init telemetry");
//!
//!     // Logs and metrics are now being collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `KERNEL_SERVICE_NAME` | `microkernel` | Service name in logs |
//! | `KERNEL_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honoured) |
//! | `KERNEL_JSON_LOGS` | `false` (`true` in containers) | JSON output |
//! | `KERNEL_CONSOLE_OUTPUT` | `true` | Console output |
//! | `KERNEL_ENVIRONMENT` | `development` | Deployment environment |

mod config;
mod logging;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, record_lifecycle_operation, record_module_failure, register_metrics,
    HookTimer, MetricsHandle, DRIVER_HEALTH_PERCENTAGE, LIFECYCLE_OPERATIONS, MODULE_FAILURES,
    MODULE_HOOK_DURATION, MONITOR_EVENTS_LOGGED, PROCESS_CPU_PERCENT, PROCESS_MEMORY_BYTES,
    PROCESS_THREADS, REGISTERED_DRIVERS, REGISTERED_MODULES,
};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
/// A second call fails with [`TelemetryError::SubscriberInit`] because the
/// global subscriber is already set.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    config.validate()?;

    // Metrics first so that anything logged during setup can be counted
    let metrics = register_metrics()?;
    let tracing = tracing_setup::init_tracing(&config)?;

    Ok(TelemetryGuard {
        _tracing: tracing,
        metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// Handle for rendering metrics.
    #[must_use]
    pub fn metrics(&self) -> MetricsHandle {
        self.metrics
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
