//! Demo modules wired by the host binary.
//!
//! | Module | Level | Notes |
//! |--------|-------|-------|
//! | `storage` | Infrastructure | connects a [`DocumentStore`] |
//! | `cache` | Core, parallel | warms an in-memory map |
//! | `sessions` | Core, parallel | same phase as `cache` |
//! | `scheduler` | Service | background tick task while running |
//! | `drivers` | Critical | drives the [`DriverRegistry`] clocks |

use async_trait::async_trait;
use mk_02_driver_registry::{Driver, DriverError, DriverHandle, DriverHealth, DriverRegistry};
use parking_lot::{Mutex, RwLock};
use shared_types::entities::{DriverId, DriverState, ModuleId};
use shared_types::health::ModuleHealth;
use shared_types::priority::{PriorityConfig, PriorityLevel};
use shared_types::{DiagnosticsSink, DocumentStore, Module, ModuleContext, ModuleError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

// =============================================================================
// Storage
// =============================================================================

pub struct StorageModule {
    store: Arc<dyn DocumentStore>,
}

impl StorageModule {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for StorageModule {
    fn id(&self) -> ModuleId {
        ModuleId::from("storage")
    }

    fn name(&self) -> &str {
        "Storage"
    }

    fn priority(&self) -> PriorityConfig {
        PriorityConfig::at_level(PriorityLevel::Infrastructure)
    }

    async fn on_initialize(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.store.connect().await?;
        info!(info = ?self.store.connection_info(), "[Storage] Connected");
        Ok(())
    }

    async fn on_start(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        if !self.store.ping().await? {
            return Err(ModuleError::Dependency {
                dependency: "document store".to_string(),
                reason: "ping failed".to_string(),
            });
        }
        Ok(())
    }

    async fn on_stop(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn on_shutdown(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.store.disconnect().await?;
        Ok(())
    }

    async fn on_get_health(&self, _ctx: &ModuleContext) -> Result<ModuleHealth, ModuleError> {
        if !self.store.is_connected() {
            return Ok(ModuleHealth::unhealthy("store disconnected"));
        }
        match self.store.ping().await {
            Ok(true) => Ok(ModuleHealth::healthy("store reachable")),
            Ok(false) => Ok(ModuleHealth::warning("store did not answer ping")),
            Err(e) => Err(e.into()),
        }
    }

    async fn on_populate_diagnostics(&self, _ctx: &ModuleContext, sink: &mut DiagnosticsSink) {
        sink.record("connection", self.store.connection_info());
    }
}

// =============================================================================
// Cache and sessions
// =============================================================================

/// Key/value map warmed on initialize and cleared on shutdown.
pub struct CacheModule {
    id: &'static str,
    name: &'static str,
    entries: RwLock<HashMap<String, String>>,
    warm_keys: usize,
}

impl CacheModule {
    pub fn cache() -> Self {
        Self::named("cache", "Cache", 64)
    }

    pub fn sessions() -> Self {
        Self::named("sessions", "Sessions", 16)
    }

    fn named(id: &'static str, name: &'static str, warm_keys: usize) -> Self {
        Self {
            id,
            name,
            entries: RwLock::new(HashMap::new()),
            warm_keys,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl Module for CacheModule {
    fn id(&self) -> ModuleId {
        ModuleId::from(self.id)
    }

    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> PriorityConfig {
        PriorityConfig::builder(PriorityLevel::Core)
            .parallel(true)
            .tag("memory")
            .build()
            .unwrap_or_else(|_| PriorityConfig::at_level(PriorityLevel::Core))
    }

    async fn on_initialize(&self, ctx: &ModuleContext) -> Result<(), ModuleError> {
        let mut entries = self.entries.write();
        for i in 0..self.warm_keys {
            if ctx.is_cancelled() {
                return Err(ModuleError::Canceled);
            }
            entries.insert(format!("{}:{i}", self.id), String::new());
        }
        Ok(())
    }

    async fn on_start(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn on_stop(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn on_shutdown(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.entries.write().clear();
        Ok(())
    }

    async fn on_populate_diagnostics(&self, _ctx: &ModuleContext, sink: &mut DiagnosticsSink) {
        sink.record("entries", self.len());
    }
}

// =============================================================================
// Scheduler
// =============================================================================

struct Ticker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs a tick task while the engine is running.
pub struct SchedulerModule {
    interval: Duration,
    ticks: Arc<AtomicU64>,
    ticker: Mutex<Option<Ticker>>,
}

impl SchedulerModule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ticks: Arc::new(AtomicU64::new(0)),
            ticker: Mutex::new(None),
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    async fn halt(&self) {
        let ticker = self.ticker.lock().take();
        let Some(ticker) = ticker else {
            return;
        };
        ticker.token.cancel();
        if let Err(e) = ticker.handle.await {
            debug!("[Scheduler] Tick task ended abnormally: {}", e);
        }
    }
}

#[async_trait]
impl Module for SchedulerModule {
    fn id(&self) -> ModuleId {
        ModuleId::from("scheduler")
    }

    fn name(&self) -> &str {
        "Scheduler"
    }

    fn priority(&self) -> PriorityConfig {
        PriorityConfig::builder(PriorityLevel::Service)
            .sub_priority(10)
            .adjust("development", -10)
            .build()
            .unwrap_or_else(|_| PriorityConfig::at_level(PriorityLevel::Service))
    }

    async fn on_initialize(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn on_start(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        let mut slot = self.ticker.lock();
        if slot.is_some() {
            return Ok(());
        }
        let token = CancellationToken::new();
        let child = token.clone();
        let ticks = self.ticks.clone();
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = timer.tick() => {
                        ticks.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        });
        *slot = Some(Ticker { token, handle });
        Ok(())
    }

    async fn on_stop(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.halt().await;
        Ok(())
    }

    async fn on_shutdown(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.halt().await;
        Ok(())
    }

    async fn on_get_health(&self, _ctx: &ModuleContext) -> Result<ModuleHealth, ModuleError> {
        let running = self.ticker.lock().is_some();
        Ok(if running {
            ModuleHealth::healthy("ticking").with_data("ticks", self.ticks().into())
        } else {
            ModuleHealth::warning("idle")
        })
    }

    async fn on_populate_diagnostics(&self, _ctx: &ModuleContext, sink: &mut DiagnosticsSink) {
        sink.record("ticks", self.ticks());
        sink.record("interval_ms", self.interval.as_millis() as u64);
    }
}

// =============================================================================
// Drivers
// =============================================================================

/// Monotonic clock exposed as a driver.
pub struct ClockDriver {
    handle: DriverHandle,
    started: std::time::Instant,
}

impl ClockDriver {
    pub fn new(id: &str) -> Self {
        Self {
            handle: DriverHandle::new(id, "Monotonic clock", "timer"),
            started: std::time::Instant::now(),
        }
    }

    pub fn set_state(&self, state: DriverState) -> DriverState {
        self.handle.set_state(state)
    }
}

#[async_trait]
impl Driver for ClockDriver {
    fn id(&self) -> DriverId {
        self.handle.id()
    }

    fn name(&self) -> &str {
        self.handle.name()
    }

    fn driver_type(&self) -> &str {
        self.handle.driver_type()
    }

    fn state(&self) -> DriverState {
        self.handle.state()
    }

    fn subscribe_state(&self) -> watch::Receiver<DriverState> {
        self.handle.subscribe()
    }

    async fn check_health(&self) -> Result<DriverHealth, DriverError> {
        Ok(match self.state() {
            DriverState::Running => DriverHealth::healthy(format!(
                "up {}ms",
                self.started.elapsed().as_millis()
            )),
            other => DriverHealth::unhealthy(format!("state {other}")),
        })
    }
}

/// Brings the driver registry's clocks up with the engine and reports the
/// registry's health percentage as module health.
pub struct DriversModule {
    registry: Arc<DriverRegistry>,
}

impl DriversModule {
    pub fn new(registry: Arc<DriverRegistry>) -> Self {
        Self { registry }
    }

    fn set_clocks(&self, state: DriverState) {
        for clock in self.registry.get_by_type::<ClockDriver>() {
            clock.set_state(state);
        }
    }
}

#[async_trait]
impl Module for DriversModule {
    fn id(&self) -> ModuleId {
        ModuleId::from("drivers")
    }

    fn name(&self) -> &str {
        "Drivers"
    }

    fn priority(&self) -> PriorityConfig {
        PriorityConfig::at_level(PriorityLevel::Critical)
    }

    async fn on_initialize(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        if self.registry.is_closed() {
            return Err(ModuleError::failed("driver registry is closed"));
        }
        self.set_clocks(DriverState::Starting);
        Ok(())
    }

    async fn on_start(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.set_clocks(DriverState::Running);
        Ok(())
    }

    async fn on_stop(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.set_clocks(DriverState::Stopped);
        Ok(())
    }

    async fn on_shutdown(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        let released = self.registry.shutdown();
        debug!(released, "[Drivers] Registry disposed");
        Ok(())
    }

    async fn on_get_health(&self, _ctx: &ModuleContext) -> Result<ModuleHealth, ModuleError> {
        let report = self.registry.validate_health().await;
        let percentage = report.health_percentage();
        let health = if report.total() == 0 || report.all_healthy() {
            ModuleHealth::healthy(format!("{} drivers", report.total()))
        } else if report.healthy.is_empty() {
            ModuleHealth::critical(format!("0/{} drivers healthy", report.total()))
        } else {
            ModuleHealth::warning(format!(
                "{}/{} drivers healthy",
                report.healthy.len(),
                report.total()
            ))
        };
        Ok(health.with_data("health_percentage", percentage.into()))
    }

    async fn on_populate_diagnostics(&self, _ctx: &ModuleContext, sink: &mut DiagnosticsSink) {
        let drivers: Vec<String> = self
            .registry
            .all()
            .iter()
            .map(|d| format!("{} ({}, {})", d.id(), d.driver_type(), d.state()))
            .collect();
        sink.record("drivers", drivers);
    }
}
