//! Prometheus metrics for the kernel.
//!
//! All metrics follow the naming convention: `mk_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., lifecycle_operations_total)
//! - **Gauge**: Value that can go up or down (e.g., registered_drivers)
//! - **Histogram**: Distribution of values (e.g., module_hook_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts,
    Registry, TextEncoder,
};
use std::time::Instant;

use crate::TelemetryError;

lazy_static! {
    /// Kernel metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // ENGINE METRICS
    // =========================================================================

    /// Lifecycle operations by outcome
    pub static ref LIFECYCLE_OPERATIONS: CounterVec = CounterVec::new(
        Opts::new("mk_engine_lifecycle_operations_total", "Engine lifecycle operations"),
        &["operation", "outcome"]  // outcome: success/failure/rejected
    ).expect("metric creation failed");

    /// Duration of individual module hooks
    pub static ref MODULE_HOOK_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "mk_engine_module_hook_duration_seconds",
            "Time spent inside a module lifecycle hook"
        ).buckets(exponential_buckets(0.0005, 2.0, 16).expect("bucket creation failed")),
        &["operation"]
    ).expect("metric creation failed");

    /// Failed module hooks (error, timeout, panic or cancellation)
    pub static ref MODULE_FAILURES: CounterVec = CounterVec::new(
        Opts::new("mk_engine_module_failures_total", "Failed module lifecycle hooks"),
        &["operation"]
    ).expect("metric creation failed");

    /// Modules registered with the engine
    pub static ref REGISTERED_MODULES: Gauge = Gauge::new(
        "mk_engine_registered_modules",
        "Number of modules registered with the engine"
    ).expect("metric creation failed");

    // =========================================================================
    // DRIVER REGISTRY METRICS
    // =========================================================================

    /// Drivers currently registered
    pub static ref REGISTERED_DRIVERS: Gauge = Gauge::new(
        "mk_registry_registered_drivers",
        "Number of drivers in the registry"
    ).expect("metric creation failed");

    /// Result of the last health validation
    pub static ref DRIVER_HEALTH_PERCENTAGE: Gauge = Gauge::new(
        "mk_registry_health_percentage",
        "Percentage of healthy drivers at the last validation"
    ).expect("metric creation failed");

    // =========================================================================
    // MONITOR METRICS
    // =========================================================================

    /// Events appended to the monitor event log
    pub static ref MONITOR_EVENTS_LOGGED: Counter = Counter::new(
        "mk_monitor_events_logged_total",
        "Events appended to the monitor event log"
    ).expect("metric creation failed");

    /// Process CPU usage sampled by the monitor
    pub static ref PROCESS_CPU_PERCENT: Gauge = Gauge::new(
        "mk_monitor_process_cpu_percent",
        "Process CPU usage in percent"
    ).expect("metric creation failed");

    /// Process resident memory sampled by the monitor
    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        "mk_monitor_process_memory_bytes",
        "Process resident memory in bytes"
    ).expect("metric creation failed");

    /// Process thread count sampled by the monitor
    pub static ref PROCESS_THREADS: Gauge = Gauge::new(
        "mk_monitor_process_threads",
        "Number of threads in the process"
    ).expect("metric creation failed");
}

/// Handle to the registered metrics.
#[derive(Debug, Clone, Copy)]
pub struct MetricsHandle {
    _private: (),
}

impl MetricsHandle {
    /// Render all metrics in the Prometheus text exposition format.
    pub fn gather_text(&self) -> Result<String, TelemetryError> {
        encode_metrics()
    }
}

/// Register all metrics with the kernel registry.
///
/// Calling it again is harmless: already-registered collectors are skipped.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Engine
        Box::new(LIFECYCLE_OPERATIONS.clone()),
        Box::new(MODULE_HOOK_DURATION.clone()),
        Box::new(MODULE_FAILURES.clone()),
        Box::new(REGISTERED_MODULES.clone()),
        // Registry
        Box::new(REGISTERED_DRIVERS.clone()),
        Box::new(DRIVER_HEALTH_PERCENTAGE.clone()),
        // Monitor
        Box::new(MONITOR_EVENTS_LOGGED.clone()),
        Box::new(PROCESS_CPU_PERCENT.clone()),
        Box::new(PROCESS_MEMORY_BYTES.clone()),
        Box::new(PROCESS_THREADS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle { _private: () })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Observes the elapsed time of a module hook on drop.
pub struct HookTimer {
    operation: &'static str,
    start: Instant,
}

impl HookTimer {
    /// Start timing a hook for the given operation label.
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for HookTimer {
    fn drop(&mut self) {
        MODULE_HOOK_DURATION
            .with_label_values(&[self.operation])
            .observe(self.start.elapsed().as_secs_f64());
    }
}

/// Record the outcome of an engine operation.
pub fn record_lifecycle_operation(operation: &str, outcome: &str) {
    LIFECYCLE_OPERATIONS
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Record a failed module hook.
pub fn record_module_failure(operation: &str) {
    MODULE_FAILURES.with_label_values(&[operation]).inc();
}
