//! # Monitor Service
//!
//! The monitor is itself a kernel module (level `Monitoring`, so it starts
//! after everything it observes and stops first). While running it owns
//! three background tasks:
//!
//! - a metrics loop sampling the process every `metrics_interval`
//! - a health loop querying the engine every `health_check_interval` and
//!   logging a summary event
//! - a bus listener translating `KernelEvent`s into log entries
//!
//! A failed or panicking cycle is logged and the loop keeps its schedule.
//! Reads (`recent_events`, `latest_metrics`, `dashboard_data`) only touch
//! the results of completed cycles and never wait on a loop.

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use shared_bus::{EventFilter, InMemoryEventBus, Subscription};
use shared_types::entities::{LifecycleState, ModuleId};
use shared_types::health::{EngineHealth, HealthStatus, ModuleHealth};
use shared_types::priority::{PriorityConfig, PriorityLevel};
use shared_types::{DiagnosticsSink, Module, ModuleContext, ModuleError};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::SysinfoSampler;
use crate::config::MonitorConfig;
use crate::domain::{
    category, DashboardData, EventLog, EventSeverity, MetricsSnapshot, ModuleStatus,
    MonitorError, MonitorEvent,
};
use crate::ports::{EngineHealthSource, MetricsSampler, MonitorApi};

/// Module id the monitor registers under.
pub const MONITOR_MODULE_ID: &str = "kernel-monitor";

/// Consecutive failed metrics cycles before the monitor reports `Warning`.
const DEGRADED_AFTER_FAILURES: u64 = 3;

/// State shared between the monitor and its background tasks.
struct Shared {
    config: MonitorConfig,
    events: EventLog,
    metrics: RwLock<Option<MetricsSnapshot>>,
    health: RwLock<Option<EngineHealth>>,
    sampler: Mutex<Box<dyn MetricsSampler>>,
    source: RwLock<Option<Arc<dyn EngineHealthSource>>>,
    metrics_cycles: AtomicU64,
    health_cycles: AtomicU64,
    failed_cycles: AtomicU64,
    consecutive_metric_failures: AtomicU64,
}

struct BackgroundLoops {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

/// Health aggregator and diagnostics collector.
pub struct Monitor {
    id: ModuleId,
    shared: Arc<Shared>,
    event_bus: Option<Arc<InMemoryEventBus>>,
    loops: Mutex<Option<BackgroundLoops>>,
}

impl Monitor {
    /// Monitor sampling the current process.
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        let sampler = SysinfoSampler::current()?;
        Self::with_sampler(config, Box::new(sampler))
    }

    /// Monitor with a custom metrics sampler.
    pub fn with_sampler(
        config: MonitorConfig,
        sampler: Box<dyn MetricsSampler>,
    ) -> Result<Self, MonitorError> {
        config.validate()?;
        Ok(Self {
            id: ModuleId::new(MONITOR_MODULE_ID),
            shared: Arc::new(Shared {
                events: EventLog::new(config.event_capacity),
                config,
                metrics: RwLock::new(None),
                health: RwLock::new(None),
                sampler: Mutex::new(sampler),
                source: RwLock::new(None),
                metrics_cycles: AtomicU64::new(0),
                health_cycles: AtomicU64::new(0),
                failed_cycles: AtomicU64::new(0),
                consecutive_metric_failures: AtomicU64::new(0),
            }),
            event_bus: None,
            loops: Mutex::new(None),
        })
    }

    /// Record bus events while running.
    #[must_use]
    pub fn with_event_bus(mut self, event_bus: Arc<InMemoryEventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Connect the engine whose health is polled. Replaces any previous source.
    pub fn attach_source(&self, source: Arc<dyn EngineHealthSource>) {
        *self.shared.source.write() = Some(source);
        debug!("[Monitor] Engine health source attached");
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.shared.config
    }

    pub fn log_event(&self, event: MonitorEvent) {
        self.shared.log(event);
    }

    pub fn recent_events(&self, n: usize) -> Vec<MonitorEvent> {
        self.shared.events.recent(n)
    }

    pub fn all_events(&self) -> Vec<MonitorEvent> {
        self.shared.events.all()
    }

    pub fn latest_metrics(&self) -> Option<MetricsSnapshot> {
        self.shared.metrics.read().clone()
    }

    /// Engine health stored by the latest completed health cycle.
    pub fn latest_health(&self) -> Option<EngineHealth> {
        self.shared.health.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.loops.lock().is_some()
    }

    /// Run one metrics cycle now, outside the timer.
    pub fn collect_metrics(&self) -> Result<MetricsSnapshot, MonitorError> {
        self.shared.collect_metrics()
    }

    /// Run one health cycle now, outside the timer.
    pub async fn check_health(
        &self,
        cancellation: CancellationToken,
    ) -> Result<EngineHealth, MonitorError> {
        self.shared.check_health(cancellation).await
    }

    pub async fn dashboard_data(&self) -> DashboardData {
        let shared = &self.shared;
        let (identity, health, metrics, recent_events) = tokio::join!(
            async { shared.engine_identity() },
            async { shared.health.read().clone() },
            async { shared.metrics.read().clone() },
            async { shared.events.recent(shared.config.dashboard_event_count) },
        );

        let (engine_id, version, live_state) = identity;
        let state = live_state
            .or_else(|| health.as_ref().map(|h| h.engine_state))
            .unwrap_or(LifecycleState::Created);

        DashboardData {
            engine_id,
            version,
            state,
            is_healthy: health.as_ref().map(|h| h.is_healthy),
            health_checked_at: health.as_ref().map(|h| h.checked_at),
            modules: health
                .as_ref()
                .map(|h| h.modules.iter().map(ModuleStatus::from).collect())
                .unwrap_or_default(),
            recent_events,
            metrics,
            generated_at: Utc::now(),
        }
    }

    fn start_loops(&self) {
        let mut loops = self.loops.lock();
        if loops.is_some() {
            debug!("[Monitor] Background loops already running");
            return;
        }

        let token = CancellationToken::new();
        // Subscribe before spawning so nothing published after start is missed
        let subscription = self
            .event_bus
            .as_ref()
            .map(|bus| bus.subscribe(EventFilter::all()));

        let mut handles = vec![
            tokio::spawn(run_metrics_loop(self.shared.clone(), token.clone())),
            tokio::spawn(run_health_loop(self.shared.clone(), token.clone())),
        ];
        if let Some(subscription) = subscription {
            handles.push(tokio::spawn(run_event_listener(
                self.shared.clone(),
                subscription,
                token.clone(),
            )));
        }

        info!(
            metrics_interval_secs = self.shared.config.metrics_interval_secs,
            health_interval_secs = self.shared.config.health_check_interval_secs,
            "[Monitor] Background loops started"
        );
        *loops = Some(BackgroundLoops { token, handles });
    }

    /// Cancel the loops and wait for them. Errors are logged, never returned.
    async fn stop_loops(&self) {
        let loops = self.loops.lock().take();
        let Some(loops) = loops else {
            return;
        };

        loops.token.cancel();
        for result in join_all(loops.handles).await {
            if let Err(e) = result {
                warn!(error = %e, "[Monitor] Background loop ended abnormally");
            }
        }
        info!("[Monitor] Background loops stopped");
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Some(loops) = self.loops.get_mut().take() {
            loops.token.cancel();
        }
    }
}

impl Shared {
    fn log(&self, event: MonitorEvent) {
        self.events.push(event);
        kernel_telemetry::metric_inc!(kernel_telemetry::MONITOR_EVENTS_LOGGED);
    }

    fn collect_metrics(&self) -> Result<MetricsSnapshot, MonitorError> {
        let result = self.sampler.lock().sample();
        match result {
            Ok(snapshot) => {
                kernel_telemetry::PROCESS_CPU_PERCENT.set(f64::from(snapshot.cpu_percent));
                kernel_telemetry::PROCESS_MEMORY_BYTES.set(snapshot.memory_bytes as f64);
                if let Some(threads) = snapshot.thread_count {
                    kernel_telemetry::PROCESS_THREADS.set(threads as f64);
                }
                *self.metrics.write() = Some(snapshot.clone());
                self.metrics_cycles.fetch_add(1, Ordering::Relaxed);
                self.consecutive_metric_failures.store(0, Ordering::Relaxed);
                Ok(snapshot)
            }
            Err(e) => {
                self.failed_cycles.fetch_add(1, Ordering::Relaxed);
                self.consecutive_metric_failures
                    .fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    async fn check_health(
        &self,
        cancellation: CancellationToken,
    ) -> Result<EngineHealth, MonitorError> {
        let source = self
            .source
            .read()
            .clone()
            .ok_or(MonitorError::SourceUnavailable)?;

        let health = match source.engine_health(cancellation).await {
            Ok(health) => health,
            Err(e) => {
                self.failed_cycles.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        let severity = if health.is_healthy {
            EventSeverity::Info
        } else {
            EventSeverity::Warning
        };
        self.log(
            MonitorEvent::new(
                "HealthCheck",
                category::HEALTH,
                severity,
                "Health check",
                format!("{}/{} modules healthy", health.healthy, health.total()),
            )
            .with_data("healthy", health.healthy.into())
            .with_data("total", health.total().into())
            .with_data("engine_state", health.engine_state.name().into()),
        );

        *self.health.write() = Some(health.clone());
        self.health_cycles.fetch_add(1, Ordering::Relaxed);
        Ok(health)
    }

    /// Engine id, version and live state; placeholders when detached.
    fn engine_identity(&self) -> (String, String, Option<LifecycleState>) {
        let source = self.source.read().clone();
        match source {
            Some(source) => (
                source.engine_id().unwrap_or_else(|_| "unknown".to_string()),
                source
                    .engine_version()
                    .unwrap_or_else(|_| "unknown".to_string()),
                source.engine_state().ok(),
            ),
            None => ("unknown".to_string(), "unknown".to_string(), None),
        }
    }
}

async fn run_metrics_loop(shared: Arc<Shared>, token: CancellationToken) {
    let mut ticker = tokio::time::interval(shared.config.metrics_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let cycle = std::panic::catch_unwind(AssertUnwindSafe(|| shared.collect_metrics()));
                match cycle {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => warn!(error = %e, "[Monitor] Metrics collection failed"),
                    Err(_) => {
                        shared.failed_cycles.fetch_add(1, Ordering::Relaxed);
                        warn!("[Monitor] Metrics collection panicked");
                    }
                }
            }
        }
    }
    debug!("[Monitor] Metrics loop exited");
}

async fn run_health_loop(shared: Arc<Shared>, token: CancellationToken) {
    let mut ticker = tokio::time::interval(shared.config.health_check_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let cycle = AssertUnwindSafe(shared.check_health(token.child_token()))
                    .catch_unwind()
                    .await;
                match cycle {
                    Ok(Ok(health)) => debug!(
                        healthy = health.healthy,
                        total = health.total(),
                        "[Monitor] Health check completed"
                    ),
                    Ok(Err(e)) => warn!(error = %e, "[Monitor] Health check failed"),
                    Err(_) => {
                        shared.failed_cycles.fetch_add(1, Ordering::Relaxed);
                        warn!("[Monitor] Health check panicked");
                    }
                }
            }
        }
    }
    debug!("[Monitor] Health loop exited");
}

async fn run_event_listener(
    shared: Arc<Shared>,
    mut subscription: Subscription,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            event = subscription.recv() => match event {
                Some(event) => shared.log(MonitorEvent::from_kernel_event(&event)),
                None => break,
            },
        }
    }
    if subscription.lagged() > 0 {
        warn!(
            lagged = subscription.lagged(),
            "[Monitor] Event listener fell behind the bus"
        );
    }
}

#[async_trait]
impl Module for Monitor {
    fn id(&self) -> ModuleId {
        self.id.clone()
    }

    fn name(&self) -> &str {
        "Kernel Monitor"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn priority(&self) -> PriorityConfig {
        PriorityConfig::at_level(PriorityLevel::Monitoring)
    }

    async fn on_initialize(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        if self.shared.source.read().is_none() {
            warn!("[Monitor] No engine health source attached; health cycles will fail");
        }
        Ok(())
    }

    async fn on_start(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.start_loops();
        Ok(())
    }

    async fn on_stop(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.stop_loops().await;
        Ok(())
    }

    async fn on_shutdown(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.stop_loops().await;
        Ok(())
    }

    async fn on_get_health(&self, _ctx: &ModuleContext) -> Result<ModuleHealth, ModuleError> {
        let failures = self
            .shared
            .consecutive_metric_failures
            .load(Ordering::Relaxed);
        let health = if failures >= DEGRADED_AFTER_FAILURES {
            ModuleHealth::warning(format!("{failures} consecutive metrics cycles failed"))
        } else {
            ModuleHealth::healthy("monitor operational")
        };
        Ok(health
            .with_data("running", self.is_running().into())
            .with_data("events", self.shared.events.len().into()))
    }

    async fn on_populate_diagnostics(&self, _ctx: &ModuleContext, sink: &mut DiagnosticsSink) {
        let shared = &self.shared;
        sink.record("running", self.is_running());
        sink.record("source_attached", shared.source.read().is_some());
        sink.record("event_count", shared.events.len());
        sink.record("event_capacity", shared.events.capacity());
        sink.record("metrics_cycles", shared.metrics_cycles.load(Ordering::Relaxed));
        sink.record("health_cycles", shared.health_cycles.load(Ordering::Relaxed));
        sink.record("failed_cycles", shared.failed_cycles.load(Ordering::Relaxed));
        sink.record("latest_metrics", self.latest_metrics());
        sink.record(
            "latest_health_status",
            self.latest_health()
                .map(|h| h.worst_status())
                .unwrap_or(HealthStatus::Healthy),
        );
    }
}

#[async_trait]
impl MonitorApi for Monitor {
    fn log_event(&self, event: MonitorEvent) {
        Monitor::log_event(self, event);
    }

    fn recent_events(&self, n: usize) -> Vec<MonitorEvent> {
        Monitor::recent_events(self, n)
    }

    fn all_events(&self) -> Vec<MonitorEvent> {
        Monitor::all_events(self)
    }

    fn latest_metrics(&self) -> Option<MetricsSnapshot> {
        Monitor::latest_metrics(self)
    }

    async fn dashboard_data(&self) -> DashboardData {
        Monitor::dashboard_data(self).await
    }
}
