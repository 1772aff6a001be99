//! # Kernel Runtime Host
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logging + metrics)
//! 2. Load engine and monitor configuration from the environment
//! 3. Register the demo modules, the driver registry and the monitor
//! 4. Initialize, then Start
//! 5. Run until Ctrl+C, then Shutdown
//!
//! A failed Initialize is the one lifecycle failure re-raised to the
//! process: the engine is shut down first, then the error is returned.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use kernel_runtime::adapters::InMemoryDocumentStore;
use kernel_runtime::demo::{
    CacheModule, ClockDriver, DriversModule, SchedulerModule, StorageModule,
};
use kernel_runtime::{EngineConfig, KernelEngine};
use kernel_telemetry::{init_telemetry, TelemetryConfig};
use mk_02_driver_registry::DriverRegistry;
use mk_03_monitor::{Monitor, MonitorConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = EngineConfig::from_env();
    let engine = Arc::new(KernelEngine::new(config).context("Invalid engine configuration")?);
    let bus = engine.event_bus();

    let drivers = Arc::new(DriverRegistry::new().with_event_bus(bus.clone()));
    drivers
        .register(Arc::new(ClockDriver::new("clock0")))
        .context("Failed to register clock driver")?;

    let monitor_config = MonitorConfig::from_env();
    monitor_config
        .validate()
        .context("Invalid monitor configuration")?;
    let monitor = Arc::new(
        Monitor::new(monitor_config)
            .context("Failed to create monitor")?
            .with_event_bus(bus),
    );

    engine.register(Arc::new(DriversModule::new(drivers)))?;
    engine.register(Arc::new(StorageModule::new(Arc::new(
        InMemoryDocumentStore::new("kernel"),
    ))))?;
    engine.register(Arc::new(CacheModule::cache()))?;
    engine.register(Arc::new(CacheModule::sessions()))?;
    engine.register(Arc::new(SchedulerModule::new(Duration::from_secs(1))))?;
    engine.register_monitor(monitor.clone())?;

    info!("===========================================");
    info!("  {} v{}", engine.name(), engine.version());
    info!("  Context: {}", engine.config().context);
    info!("  Plan: {}", engine.phase_plan());
    info!("===========================================");

    let token = CancellationToken::new();
    let initialized = engine.initialize(&token).await;
    if !initialized.success {
        error!("Initialize failed: {}", initialized.message);
        engine.shutdown(&CancellationToken::new()).await;
        let cause = match initialized.error {
            Some(err) => anyhow::Error::new(err),
            None => anyhow::anyhow!(initialized.message),
        };
        return Err(cause.context("Engine failed to initialize"));
    }

    let started = engine.start(&token).await;
    if !started.success {
        warn!("Start completed with failures: {}", started.message);
    }

    info!("Kernel is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    let dashboard = monitor.dashboard_data().await;
    info!(
        events = dashboard.recent_events.len(),
        modules = dashboard.modules.len(),
        "Final dashboard snapshot"
    );

    let shutdown = engine.shutdown(&CancellationToken::new()).await;
    if !shutdown.success {
        warn!("Shutdown completed with failures: {}", shutdown.message);
    }

    match telemetry.metrics().gather_text() {
        Ok(text) => debug!("Final metrics:\n{}", text),
        Err(e) => warn!("Failed to render metrics: {}", e),
    }

    Ok(())
}
