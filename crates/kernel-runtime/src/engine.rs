//! # Kernel Engine
//!
//! Owns the registered modules and drives them through
//! Initialize / Start / Stop / Shutdown.
//!
//! ## Operation Flow
//!
//! ```text
//! caller ──► op_lock ──► state machine (begin) ──► phase plan
//!                                                   │
//!                              LifecycleCoordinator ◄┘
//!                                                   │
//!            rollback / stop pass (when needed) ◄───┤
//!                                                   ▼
//!              state machine (complete) ──► LifecycleCompleted event
//! ```
//!
//! Operations are serialized: a second caller waits for the first to
//! finish. Health and diagnostics queries never take the operation lock.
//!
//! ## Failure Policy
//!
//! | `continue_on_module_failure` | Initialize / Start / Stop | Shutdown |
//! |------------------------------|---------------------------|----------|
//! | `false` | finish the failing phase, stop dispatching, engine `Faulted` | attempt every module |
//! | `true` | attempt every module, nominal target state | attempt every module |
//!
//! An aborted or canceled Initialize rolls back every module that reached
//! `Initialized` through `on_shutdown`, in reverse plan order.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use mk_01_priority_resolver::{PhasePlan, PriorityResolver, PriorityResolverApi, ResolverConfig};
use mk_03_monitor::Monitor;
use parking_lot::RwLock;
use shared_bus::{EventFilter, InMemoryEventBus, KernelEvent, Subscription};
use shared_types::entities::{LifecycleOperation, LifecycleState, ModuleDescriptor, ModuleId};
use shared_types::health::{EngineHealth, ModuleHealth, ModuleHealthEntry};
use shared_types::{DiagnosticsSink, Module, ModuleContext, ModuleDiagnostics};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapters::EngineMonitorSource;
use crate::config::{ConfigError, EngineConfig};
use crate::coordinator::{FailurePolicy, LifecycleCoordinator, PlanOutcome};
use crate::domain::{
    EngineDiagnostics, EngineStateMachine, LifecycleError, LifecycleResult, ModuleResult,
};
use crate::registry::ModuleRegistry;

pub struct KernelEngine {
    config: EngineConfig,
    resolver: PriorityResolver,
    registry: Arc<ModuleRegistry>,
    coordinator: LifecycleCoordinator,
    event_bus: Arc<InMemoryEventBus>,
    state: RwLock<EngineStateMachine>,
    op_lock: Mutex<()>,
    last_results: RwLock<HashMap<LifecycleOperation, LifecycleResult>>,
    created_at: Instant,
}

impl KernelEngine {
    /// Engine with its own event bus.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_event_bus(config, Arc::new(InMemoryEventBus::new()))
    }

    /// Engine publishing onto a shared event bus.
    pub fn with_event_bus(
        config: EngineConfig,
        event_bus: Arc<InMemoryEventBus>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let registry = Arc::new(ModuleRegistry::new());
        let coordinator = LifecycleCoordinator::new(
            registry.clone(),
            event_bus.clone(),
            config.context.clone(),
            config.module_timeout(),
            config.max_parallelism,
        );
        let resolver = PriorityResolver::with_config(ResolverConfig::with_policy(
            config.boundary_policy,
        ));

        info!(
            engine_id = %config.engine_id,
            context = %config.context,
            policy = %config.boundary_policy,
            "[Engine] Created {} v{}",
            config.engine_name,
            config.version
        );

        Ok(Self {
            config,
            resolver,
            registry,
            coordinator,
            event_bus,
            state: RwLock::new(EngineStateMachine::new()),
            op_lock: Mutex::new(()),
            last_results: RwLock::new(HashMap::new()),
            created_at: Instant::now(),
        })
    }

    // =========================================================================
    // Registration and queries
    // =========================================================================

    /// Register a module. Only legal while the engine is `Created` and no
    /// operation is running.
    pub fn register(&self, module: Arc<dyn Module>) -> Result<(), LifecycleError> {
        let Ok(_guard) = self.op_lock.try_lock() else {
            return Err(LifecycleError::RegistrationClosed {
                state: self.state(),
            });
        };
        let state = self.state();
        if state != LifecycleState::Created {
            return Err(LifecycleError::RegistrationClosed { state });
        }

        let count = self.registry.register(module)?;
        kernel_telemetry::REGISTERED_MODULES.set(count as f64);
        Ok(())
    }

    /// Register the monitor and point it at this engine.
    pub fn register_monitor(self: &Arc<Self>, monitor: Arc<Monitor>) -> Result<(), LifecycleError> {
        monitor.attach_source(Arc::new(EngineMonitorSource::new(self)));
        self.register(monitor)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn id(&self) -> &str {
        &self.config.engine_id
    }

    pub fn name(&self) -> &str {
        &self.config.engine_name
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn state(&self) -> LifecycleState {
        self.state.read().state()
    }

    /// Registered modules in registration order.
    pub fn modules(&self) -> Vec<ModuleDescriptor> {
        self.registry.descriptors(&self.resolver, &self.config.context)
    }

    pub fn module(&self, id: &ModuleId) -> Option<ModuleDescriptor> {
        self.registry
            .descriptor(id, &self.resolver, &self.config.context)
    }

    /// The plan Initialize and Start execute. Stop and Shutdown run it in
    /// reverse.
    pub fn phase_plan(&self) -> PhasePlan {
        self.resolver
            .plan(&self.registry.candidates(), &self.config.context)
    }

    pub fn event_bus(&self) -> Arc<InMemoryEventBus> {
        self.event_bus.clone()
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.event_bus.subscribe(filter)
    }

    /// Result of the most recent execution of `operation`.
    pub fn last_result(&self, operation: LifecycleOperation) -> Option<LifecycleResult> {
        self.last_results.read().get(&operation).cloned()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub async fn initialize(&self, token: &CancellationToken) -> LifecycleResult {
        let _guard = self.op_lock.lock().await;
        let op = LifecycleOperation::Initialize;
        let clock = Instant::now();
        let started_at = Utc::now();
        if let Err(err) = self.begin(op) {
            return self.reject(op, err, started_at);
        }

        let plan = self.phase_plan();
        info!(
            modules = plan.module_count(),
            phases = plan.len(),
            "[Engine] Initializing: {}",
            plan
        );
        let outcome = self
            .coordinator
            .run_plan(op, &plan, self.failure_policy(), None, token)
            .await;

        let mut cleanup = BTreeMap::new();
        if outcome.stopped_early() {
            cleanup = self.rollback(&plan).await;
        }
        self.finish(op, clock, started_at, outcome, cleanup)
    }

    pub async fn start(&self, token: &CancellationToken) -> LifecycleResult {
        let _guard = self.op_lock.lock().await;
        let op = LifecycleOperation::Start;
        let clock = Instant::now();
        let started_at = Utc::now();
        if let Err(err) = self.begin(op) {
            return self.reject(op, err, started_at);
        }

        let plan = self.phase_plan();
        let outcome = self
            .coordinator
            .run_plan(op, &plan, self.failure_policy(), None, token)
            .await;
        self.finish(op, clock, started_at, outcome, BTreeMap::new())
    }

    pub async fn stop(&self, token: &CancellationToken) -> LifecycleResult {
        let _guard = self.op_lock.lock().await;
        let op = LifecycleOperation::Stop;
        let clock = Instant::now();
        let started_at = Utc::now();
        if let Err(err) = self.begin(op) {
            return self.reject(op, err, started_at);
        }

        let plan = self.phase_plan().reversed();
        let outcome = self
            .coordinator
            .run_plan(op, &plan, self.failure_policy(), None, token)
            .await;
        self.finish(op, clock, started_at, outcome, BTreeMap::new())
    }

    /// Best-effort teardown. Every module not yet shut down is attempted,
    /// failures are recorded, and the engine always ends in `Shutdown`.
    /// Calling it again afterwards is a successful no-op.
    pub async fn shutdown(&self, token: &CancellationToken) -> LifecycleResult {
        let _guard = self.op_lock.lock().await;
        let op = LifecycleOperation::Shutdown;
        let clock = Instant::now();
        let started_at = Utc::now();

        let was = self.state();
        if was == LifecycleState::Shutdown {
            return LifecycleResult::skipped(op, was, started_at, "Engine already shut down");
        }
        if let Err(err) = self.begin(op) {
            return self.reject(op, err, started_at);
        }

        let plan = self.phase_plan().reversed();
        let mut cleanup = BTreeMap::new();
        // A faulted Start can leave modules running; stop those too
        let running: HashSet<ModuleId> = self
            .registry
            .ids_in_state(LifecycleState::Running)
            .into_iter()
            .collect();
        if !running.is_empty() {
            info!(
                modules = running.len(),
                from = %was,
                "[Engine] Stopping running modules before shutdown"
            );
            cleanup = self
                .coordinator
                .run_plan(
                    LifecycleOperation::Stop,
                    &plan,
                    FailurePolicy::BestEffort,
                    Some(&running),
                    token,
                )
                .await
                .results;
        }

        let outcome = self
            .coordinator
            .run_plan(op, &plan, FailurePolicy::BestEffort, None, token)
            .await;
        self.finish(op, clock, started_at, outcome, cleanup)
    }

    fn failure_policy(&self) -> FailurePolicy {
        if self.config.continue_on_module_failure {
            FailurePolicy::Continue
        } else {
            FailurePolicy::Abort
        }
    }

    fn begin(&self, operation: LifecycleOperation) -> Result<(), LifecycleError> {
        let from = self.state.write().begin(operation)?;
        self.publish_state(from, operation.transitional_state());
        Ok(())
    }

    async fn rollback(&self, plan: &PhasePlan) -> BTreeMap<ModuleId, ModuleResult> {
        let initialized: HashSet<ModuleId> = self
            .registry
            .ids_in_state(LifecycleState::Initialized)
            .into_iter()
            .collect();
        if initialized.is_empty() {
            return BTreeMap::new();
        }

        warn!(
            modules = initialized.len(),
            "[Engine] Rolling back initialized modules"
        );
        // The caller's token may be the reason we are here.
        self.coordinator
            .run_plan(
                LifecycleOperation::Shutdown,
                &plan.reversed(),
                FailurePolicy::BestEffort,
                Some(&initialized),
                &CancellationToken::new(),
            )
            .await
            .results
    }

    fn finish(
        &self,
        operation: LifecycleOperation,
        clock: Instant,
        started_at: chrono::DateTime<Utc>,
        outcome: PlanOutcome,
        cleanup_results: BTreeMap<ModuleId, ModuleResult>,
    ) -> LifecycleResult {
        let stopped_early = outcome.stopped_early();
        let (from, to) = {
            let mut sm = self.state.write();
            let from = sm.state();
            (from, sm.complete(operation, stopped_early))
        };
        self.publish_state(from, to);

        let cleanup_error = cleanup_results
            .values()
            .find_map(|r| r.error.clone());
        let error = if outcome.canceled {
            Some(LifecycleError::OperationCanceled)
        } else {
            outcome.first_error.clone().or(cleanup_error)
        };
        let success = error.is_none();
        let failed = outcome.results.values().filter(|r| !r.success).count();

        let message = if success {
            format!("{} completed for {} modules", operation, outcome.results.len())
        } else if outcome.canceled {
            format!("{operation} canceled")
        } else if outcome.aborted {
            format!("{operation} aborted after {failed} module failure(s)")
        } else {
            format!("{operation} completed with {failed} module failure(s)")
        };

        let result = LifecycleResult {
            operation,
            success,
            message,
            started_at,
            duration: clock.elapsed(),
            error,
            module_results: outcome.results,
            cleanup_results,
            final_state: to,
        };

        let label = if success {
            "success"
        } else if outcome.canceled {
            "canceled"
        } else {
            "failure"
        };
        kernel_telemetry::record_lifecycle_operation(operation.label(), label);

        if success {
            info!(
                duration_ms = result.duration.as_millis() as u64,
                state = %to,
                "[Engine] {}",
                result.message
            );
        } else {
            warn!(
                duration_ms = result.duration.as_millis() as u64,
                state = %to,
                failed_modules = ?result.failed_modules(),
                "[Engine] {}",
                result.message
            );
        }

        self.event_bus.send(KernelEvent::LifecycleCompleted {
            engine_id: self.config.engine_id.clone(),
            operation,
            success,
            duration_ms: result.duration.as_millis() as u64,
            failed_modules: result.failed_modules(),
        });
        self.last_results
            .write()
            .insert(operation, result.clone());
        result
    }

    fn reject(
        &self,
        operation: LifecycleOperation,
        err: LifecycleError,
        started_at: chrono::DateTime<Utc>,
    ) -> LifecycleResult {
        warn!("[Engine] Rejected {}: {}", operation, err);
        kernel_telemetry::record_lifecycle_operation(operation.label(), "rejected");
        LifecycleResult::rejected(operation, err, self.state(), started_at)
    }

    fn publish_state(&self, from: LifecycleState, to: LifecycleState) {
        if from == to {
            return;
        }
        info!("[Engine] {} -> {}", from, to);
        self.event_bus.send(KernelEvent::EngineStateChanged {
            engine_id: self.config.engine_id.clone(),
            from,
            to,
        });
    }

    // =========================================================================
    // Health and diagnostics
    // =========================================================================

    /// Ask every module for its health, at most `max_parallelism` at a time.
    /// A probe that fails, panics or times out counts as `Unhealthy`.
    pub async fn health(&self, token: &CancellationToken) -> EngineHealth {
        let timeout = self.config.health_check_timeout();
        let context = self.config.context.as_str();

        let entries: Vec<ModuleHealthEntry> = stream::iter(self.registry.handles())
            .map(|h| async move {
                let ctx = ModuleContext::for_query(context, token.child_token());
                let probe = AssertUnwindSafe(h.module.on_get_health(&ctx)).catch_unwind();
                let checked = tokio::select! {
                    biased;
                    _ = token.cancelled() => Err("health check canceled".to_string()),
                    r = tokio::time::timeout(timeout, probe) => match r {
                        Ok(Ok(Ok(health))) => Ok(health),
                        Ok(Ok(Err(e))) => Err(e.to_string()),
                        Ok(Err(_)) => Err("health check panicked".to_string()),
                        Err(_) => Err(format!(
                            "health check timed out after {}ms",
                            timeout.as_millis()
                        )),
                    },
                };
                let health = checked.unwrap_or_else(|cause| {
                    let err = LifecycleError::HealthCheck {
                        module_id: h.id.clone(),
                        cause,
                    };
                    warn!(module_id = %h.id, "[Engine] {}", err);
                    ModuleHealth::unhealthy(err.to_string())
                });
                ModuleHealthEntry {
                    module_id: h.id,
                    name: h.name,
                    state: h.state,
                    health,
                }
            })
            .buffered(self.config.max_parallelism)
            .collect()
            .await;

        EngineHealth::aggregate(self.state(), entries)
    }

    /// Engine snapshot plus each module's self-reported diagnostics.
    pub async fn diagnostics(&self, token: &CancellationToken) -> EngineDiagnostics {
        let timeout = self.config.health_check_timeout();
        let context = self.config.context.as_str();
        let handles = self.registry.handles();
        let descriptors = self.modules();

        let modules: Vec<ModuleDiagnostics> = stream::iter(handles.into_iter().zip(descriptors))
            .map(|(h, descriptor)| async move {
                let ctx = ModuleContext::for_query(context, token.child_token());
                let started = Instant::now();
                let mut sink = DiagnosticsSink::new();
                let collected = tokio::time::timeout(
                    timeout,
                    AssertUnwindSafe(h.module.on_populate_diagnostics(&ctx, &mut sink))
                        .catch_unwind(),
                )
                .await;
                let error = match collected {
                    Ok(Ok(())) => None,
                    Ok(Err(_)) => Some("diagnostics hook panicked".to_string()),
                    Err(_) => Some(format!(
                        "diagnostics timed out after {}ms",
                        timeout.as_millis()
                    )),
                };
                if let Some(e) = &error {
                    warn!(module_id = %h.id, "[Engine] {}", e);
                }
                ModuleDiagnostics {
                    descriptor,
                    entries: sink.into_entries(),
                    error,
                    collection_time: started.elapsed(),
                }
            })
            .buffered(self.config.max_parallelism)
            .collect()
            .await;

        let last_results = self
            .last_results
            .read()
            .iter()
            .map(|(op, r)| (op.label().to_string(), r.clone()))
            .collect();

        EngineDiagnostics {
            engine_id: self.config.engine_id.clone(),
            engine_name: self.config.engine_name.clone(),
            version: self.config.version.clone(),
            state: self.state(),
            context: self.config.context.clone(),
            uptime: self.created_at.elapsed(),
            config: self.config.clone(),
            phase_plan: self.phase_plan().to_string(),
            last_results,
            modules,
            collected_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Behavior, CallLog, TestModule};
    use shared_types::health::HealthStatus;
    use shared_types::priority::{PriorityConfig, PriorityLevel};
    use std::time::Duration;
    use LifecycleOperation as Op;
    use LifecycleState as S;

    fn engine(continue_on_failure: bool) -> KernelEngine {
        let config = EngineConfig::default()
            .with_continue_on_failure(continue_on_failure)
            .with_module_timeout(Duration::from_secs(1));
        KernelEngine::new(config).unwrap()
    }

    fn id(s: &str) -> ModuleId {
        ModuleId::from(s)
    }

    /// A(Critical, barrier), B and C (Infrastructure, parallel), B fails.
    fn abc(engine: &KernelEngine, log: &CallLog) {
        engine
            .register(
                TestModule::new("A", PriorityLevel::Critical)
                    .with_log(log)
                    .into_arc(),
            )
            .unwrap();
        engine
            .register(
                TestModule::parallel("B", PriorityLevel::Infrastructure)
                    .on(Op::Initialize, Behavior::Fail)
                    .with_log(log)
                    .into_arc(),
            )
            .unwrap();
        engine
            .register(
                TestModule::parallel("C", PriorityLevel::Infrastructure)
                    .on(Op::Initialize, Behavior::Delay(Duration::from_millis(20)))
                    .with_log(log)
                    .into_arc(),
            )
            .unwrap();
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let engine = engine(false);
        let log = CallLog::default();
        engine
            .register(TestModule::new("db", PriorityLevel::Infrastructure).with_log(&log).into_arc())
            .unwrap();
        engine
            .register(TestModule::new("api", PriorityLevel::Service).with_log(&log).into_arc())
            .unwrap();
        let token = CancellationToken::new();

        assert!(engine.initialize(&token).await.success);
        assert_eq!(engine.state(), S::Initialized);
        assert!(engine.start(&token).await.success);
        assert_eq!(engine.state(), S::Running);
        assert!(engine.stop(&token).await.success);
        assert_eq!(engine.state(), S::Stopped);
        let shutdown = engine.shutdown(&token).await;
        assert!(shutdown.success);
        assert_eq!(shutdown.final_state, S::Shutdown);

        assert_eq!(
            *log.lock(),
            vec![
                "db:initialize",
                "api:initialize",
                "db:start",
                "api:start",
                "api:stop",
                "db:stop",
                "api:shutdown",
                "db:shutdown",
            ]
        );
        assert!(engine
            .modules()
            .iter()
            .all(|m| m.state == S::Shutdown));
    }

    #[tokio::test]
    async fn test_continue_on_failure_attempts_every_module() {
        let engine = engine(true);
        let log = CallLog::default();
        abc(&engine, &log);
        assert_eq!(engine.phase_plan().to_string(), "[A] -> [B, C]");

        let result = engine.initialize(&CancellationToken::new()).await;

        assert!(!result.success);
        assert!(result.module(&id("A")).unwrap().success);
        assert!(!result.module(&id("B")).unwrap().success);
        assert!(result.module(&id("C")).unwrap().success);
        assert!(matches!(
            result.error,
            Some(LifecycleError::ModuleInitialization { ref module_id, .. }) if module_id == &id("B")
        ));
        assert_eq!(result.final_state, S::Initialized);
        assert_eq!(engine.module(&id("B")).unwrap().state, S::Faulted);
        assert!(result.cleanup_results.is_empty());
    }

    #[tokio::test]
    async fn test_abort_rolls_back_initialized_modules() {
        let engine = engine(false);
        let log = CallLog::default();
        abc(&engine, &log);
        engine
            .register(TestModule::new("D", PriorityLevel::Service).with_log(&log).into_arc())
            .unwrap();

        let result = engine.initialize(&CancellationToken::new()).await;

        assert!(!result.success);
        assert_eq!(result.final_state, S::Faulted);
        assert!(result.module(&id("D")).is_none());
        assert!(!log.lock().contains(&"D:initialize".to_string()));
        // C finished its hook, then A and C are rolled back in reverse order
        let rolled_back: Vec<_> = result.cleanup_results.keys().cloned().collect();
        assert_eq!(rolled_back, vec![id("A"), id("C")]);
        let calls = log.lock().clone();
        let c_pos = calls.iter().position(|c| c == "C:shutdown").unwrap();
        let a_pos = calls.iter().position(|c| c == "A:shutdown").unwrap();
        assert!(c_pos < a_pos);
        assert_eq!(engine.module(&id("A")).unwrap().state, S::Shutdown);
        assert_eq!(engine.module(&id("D")).unwrap().state, S::Created);

        // Only Shutdown is accepted from Faulted
        let start = engine.start(&CancellationToken::new()).await;
        assert!(matches!(
            start.error,
            Some(LifecycleError::InvalidTransition { from: S::Faulted, .. })
        ));
        assert!(engine.shutdown(&CancellationToken::new()).await.final_state == S::Shutdown);
    }

    #[tokio::test]
    async fn test_timeout_faults_engine() {
        let config = EngineConfig::default().with_module_timeout(Duration::from_secs(1));
        let engine = KernelEngine::new(config).unwrap();
        engine
            .register(
                TestModule::new("stuck", PriorityLevel::Core)
                    .on(Op::Start, Behavior::Hang)
                    .into_arc(),
            )
            .unwrap();
        let token = CancellationToken::new();
        engine.initialize(&token).await;

        let result = engine.start(&token).await;

        assert!(matches!(
            result.error,
            Some(LifecycleError::ModuleTimeout { timeout_ms: 1000, .. })
        ));
        assert_eq!(engine.state(), S::Faulted);
    }

    #[tokio::test]
    async fn test_cancellation_stops_initialize() {
        let engine = engine(true);
        let log = CallLog::default();
        engine
            .register(TestModule::new("first", PriorityLevel::Critical).with_log(&log).into_arc())
            .unwrap();
        engine
            .register(
                TestModule::new("waiting", PriorityLevel::Core)
                    .on(Op::Initialize, Behavior::AwaitCancel)
                    .with_log(&log)
                    .into_arc(),
            )
            .unwrap();
        engine
            .register(TestModule::new("never", PriorityLevel::Feature).with_log(&log).into_arc())
            .unwrap();
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = engine.initialize(&token).await;

        assert_eq!(result.error, Some(LifecycleError::OperationCanceled));
        assert_eq!(result.final_state, S::Faulted);
        assert!(!log.lock().contains(&"never:initialize".to_string()));
        assert!(result.cleanup_results.contains_key(&id("first")));
    }

    #[tokio::test]
    async fn test_panicking_hook_is_contained() {
        let engine = engine(true);
        engine
            .register(
                TestModule::new("boom", PriorityLevel::Core)
                    .on(Op::Initialize, Behavior::Panic)
                    .into_arc(),
            )
            .unwrap();

        let result = engine.initialize(&CancellationToken::new()).await;

        assert!(matches!(
            result.module(&id("boom")).unwrap().error,
            Some(LifecycleError::HookPanicked { .. })
        ));
    }

    #[tokio::test]
    async fn test_shutdown_is_best_effort_and_idempotent() {
        let engine = engine(false);
        let log = CallLog::default();
        engine
            .register(
                TestModule::new("a", PriorityLevel::Core)
                    .on(Op::Shutdown, Behavior::Fail)
                    .with_log(&log)
                    .into_arc(),
            )
            .unwrap();
        engine
            .register(TestModule::new("b", PriorityLevel::Feature).with_log(&log).into_arc())
            .unwrap();
        let token = CancellationToken::new();
        engine.initialize(&token).await;
        engine.start(&token).await;

        let result = engine.shutdown(&token).await;

        assert!(!result.success);
        assert_eq!(result.final_state, S::Shutdown);
        assert_eq!(result.cleanup_results.len(), 2);
        assert!(result.module(&id("b")).unwrap().success);
        assert_eq!(engine.module(&id("a")).unwrap().state, S::Faulted);
        assert_eq!(
            log.lock()[4..].to_vec(),
            vec!["b:stop", "a:stop", "b:shutdown", "a:shutdown"]
        );

        let again = engine.shutdown(&token).await;
        assert!(again.success);
        assert!(again.module_results.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_after_failed_start_stops_running_modules() {
        let engine = engine(false);
        let log = CallLog::default();
        engine
            .register(TestModule::new("a", PriorityLevel::Core).with_log(&log).into_arc())
            .unwrap();
        engine
            .register(
                TestModule::new("b", PriorityLevel::Feature)
                    .on(Op::Start, Behavior::Fail)
                    .with_log(&log)
                    .into_arc(),
            )
            .unwrap();
        let token = CancellationToken::new();
        engine.initialize(&token).await;

        let started = engine.start(&token).await;
        assert!(!started.success);
        assert_eq!(engine.state(), S::Faulted);
        assert_eq!(engine.module(&id("a")).unwrap().state, S::Running);

        let result = engine.shutdown(&token).await;

        assert!(result.success);
        assert_eq!(result.final_state, S::Shutdown);
        assert_eq!(result.cleanup_results.len(), 1);
        assert!(result.cleanup_results[&id("a")].success);
        assert_eq!(
            log.lock()[4..].to_vec(),
            vec!["a:stop", "b:shutdown", "a:shutdown"]
        );
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let engine = engine(false);
        engine
            .register(TestModule::new("svc", PriorityLevel::Service).into_arc())
            .unwrap();
        let token = CancellationToken::new();
        engine.initialize(&token).await;
        engine.start(&token).await;
        engine.stop(&token).await;

        let result = engine.start(&token).await;

        assert!(result.success);
        assert_eq!(engine.state(), S::Running);
        assert_eq!(engine.last_result(Op::Start).unwrap().final_state, S::Running);
    }

    #[tokio::test]
    async fn test_invalid_transition_rejected() {
        let engine = engine(false);
        let result = engine.stop(&CancellationToken::new()).await;

        assert_eq!(
            result.error,
            Some(LifecycleError::InvalidTransition {
                from: S::Created,
                operation: Op::Stop
            })
        );
        assert_eq!(engine.state(), S::Created);
        assert!(engine.last_result(Op::Stop).is_none());
    }

    #[tokio::test]
    async fn test_registration_closed_after_initialize() {
        let engine = engine(false);
        engine
            .register(TestModule::new("a", PriorityLevel::Core).into_arc())
            .unwrap();
        assert_eq!(
            engine
                .register(TestModule::new("a", PriorityLevel::Core).into_arc())
                .unwrap_err(),
            LifecycleError::DuplicateModule(id("a"))
        );
        engine.initialize(&CancellationToken::new()).await;

        let err = engine
            .register(TestModule::new("late", PriorityLevel::Core).into_arc())
            .unwrap_err();
        assert_eq!(
            err,
            LifecycleError::RegistrationClosed {
                state: S::Initialized
            }
        );
    }

    #[tokio::test]
    async fn test_context_changes_plan() {
        let config = EngineConfig::default()
            .with_context("Development")
            .with_continue_on_failure(false);
        let engine = KernelEngine::new(config).unwrap();
        engine
            .register(TestModule::new("x", PriorityLevel::Core).into_arc())
            .unwrap();
        engine
            .register(
                TestModule::new("y", PriorityLevel::Core)
                    .with_priority(
                        PriorityConfig::builder(PriorityLevel::Core)
                            .sub_priority(5)
                            .adjust("development", -5)
                            .build()
                            .unwrap(),
                    )
                    .into_arc(),
            )
            .unwrap();

        // Equal effective priority, both barriers: registration order
        assert_eq!(engine.phase_plan().to_string(), "[x] -> [y]");
        assert_eq!(engine.module(&id("y")).unwrap().effective_priority, 200);
    }

    #[tokio::test]
    async fn test_health_isolates_failing_probes() {
        let engine = engine(false);
        engine
            .register(TestModule::new("ok", PriorityLevel::Core).into_arc())
            .unwrap();
        engine
            .register(
                TestModule::new("warn", PriorityLevel::Core)
                    .with_health(ModuleHealth::warning("lagging"))
                    .into_arc(),
            )
            .unwrap();
        engine
            .register(
                TestModule::new("broken", PriorityLevel::Core)
                    .with_health_behavior(Behavior::Fail)
                    .into_arc(),
            )
            .unwrap();
        engine
            .register(
                TestModule::new("crashy", PriorityLevel::Core)
                    .with_health_behavior(Behavior::Panic)
                    .into_arc(),
            )
            .unwrap();
        let token = CancellationToken::new();

        let before = engine.health(&token).await;
        assert!(!before.is_healthy);

        engine.initialize(&token).await;
        engine.start(&token).await;
        let health = engine.health(&token).await;

        assert!(health.is_healthy);
        assert_eq!(health.total(), 4);
        assert_eq!(health.healthy, 1);
        assert_eq!(health.warning, 1);
        assert_eq!(health.unhealthy, 2);
        assert_eq!(health.worst_status(), HealthStatus::Unhealthy);
        let broken = health
            .modules
            .iter()
            .find(|m| m.module_id == id("broken"))
            .unwrap();
        assert!(broken.health.message.starts_with("Health check of broken failed"));
    }

    #[tokio::test]
    async fn test_diagnostics_snapshot() {
        let engine = engine(false);
        engine
            .register(TestModule::new("good", PriorityLevel::Core).into_arc())
            .unwrap();
        engine
            .register(
                TestModule::new("bad", PriorityLevel::Feature)
                    .with_health_behavior(Behavior::Panic)
                    .into_arc(),
            )
            .unwrap();
        let token = CancellationToken::new();
        engine.initialize(&token).await;

        let diag = engine.diagnostics(&token).await;

        assert_eq!(diag.state, S::Initialized);
        assert_eq!(diag.phase_plan, "[good] -> [bad]");
        assert!(diag.last_results.contains_key("initialize"));
        assert_eq!(diag.modules.len(), 2);
        assert_eq!(diag.modules[0].entries.get("calls"), Some(&serde_json::json!(1)));
        assert!(diag.modules[0].error.is_none());
        assert_eq!(
            diag.modules[1].error.as_deref(),
            Some("diagnostics hook panicked")
        );
    }

    #[tokio::test]
    async fn test_events_published() {
        let engine = engine(false);
        engine
            .register(TestModule::new("m", PriorityLevel::Core).into_arc())
            .unwrap();
        let mut events = engine.subscribe(EventFilter::all());

        engine.initialize(&CancellationToken::new()).await;

        let mut names = Vec::new();
        while let Ok(Some(event)) = events.try_recv() {
            names.push(event.name());
        }
        assert_eq!(
            names,
            vec![
                "EngineStateChanged",
                "ModuleStateChanged",
                "ModuleStateChanged",
                "EngineStateChanged",
                "LifecycleCompleted",
            ]
        );
    }
}
