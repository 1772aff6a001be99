//! # Lifecycle Coordinator
//!
//! Executes a phase plan for one lifecycle operation.
//!
//! Phases run strictly one after another. Inside a phase every eligible
//! module's hook is dispatched concurrently and the phase resolves once all
//! of them have finished, failed, timed out or been canceled. Each hook runs:
//!
//! - under an engine-wide semaphore permit (`max_parallelism`)
//! - bounded by the per-module timeout
//! - with panics caught and turned into `HookPanicked`
//! - racing the caller's cancellation token (except under
//!   [`FailurePolicy::BestEffort`], where the hook only sees the token
//!   through its context)
//!
//! Hook outcomes never escape as errors: each one becomes a `ModuleResult`.

use futures::future::join_all;
use futures::FutureExt;
use mk_01_priority_resolver::PhasePlan;
use shared_bus::{InMemoryEventBus, KernelEvent};
use shared_types::entities::{LifecycleOperation, LifecycleState, ModuleId};
use shared_types::{Module, ModuleContext, ModuleError};
use std::collections::{BTreeMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::{LifecycleError, ModuleResult};
use crate::registry::{ModuleHandle, ModuleRegistry};

/// What the coordinator does after a module fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Finish the current phase, dispatch nothing further.
    Abort,
    /// Record the failure and keep going. Cancellation still stops dispatch.
    Continue,
    /// Attempt every module regardless of failures or cancellation.
    BestEffort,
}

/// Outcome of executing one plan.
#[derive(Debug, Default)]
pub struct PlanOutcome {
    pub results: BTreeMap<ModuleId, ModuleResult>,
    /// First failure, in phase order.
    pub first_error: Option<LifecycleError>,
    /// Set when dispatch stopped because of a failure under `Abort`.
    pub aborted: bool,
    /// Set when dispatch stopped because the token was canceled.
    pub canceled: bool,
}

impl PlanOutcome {
    pub fn success(&self) -> bool {
        self.first_error.is_none() && !self.canceled
    }

    /// Whether dispatch stopped before the end of the plan.
    pub fn stopped_early(&self) -> bool {
        self.aborted || self.canceled
    }
}

pub struct LifecycleCoordinator {
    registry: Arc<ModuleRegistry>,
    event_bus: Arc<InMemoryEventBus>,
    permits: Arc<Semaphore>,
    context: String,
    module_timeout: Duration,
}

impl LifecycleCoordinator {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        event_bus: Arc<InMemoryEventBus>,
        context: impl Into<String>,
        module_timeout: Duration,
        max_parallelism: usize,
    ) -> Self {
        Self {
            registry,
            event_bus,
            permits: Arc::new(Semaphore::new(max_parallelism.max(1))),
            context: context.into(),
            module_timeout,
        }
    }

    /// Execute `operation` over `plan`.
    ///
    /// `only` restricts the pass to the given modules (used for rollback).
    pub async fn run_plan(
        &self,
        operation: LifecycleOperation,
        plan: &PhasePlan,
        policy: FailurePolicy,
        only: Option<&HashSet<ModuleId>>,
        token: &CancellationToken,
    ) -> PlanOutcome {
        let mut outcome = PlanOutcome::default();

        for phase in plan.phases() {
            if policy != FailurePolicy::BestEffort && token.is_cancelled() {
                warn!(
                    "[Coordinator] {} canceled before phase {}",
                    operation, phase.index
                );
                outcome.canceled = true;
                break;
            }

            let handles: Vec<ModuleHandle> = phase
                .modules()
                .iter()
                .filter(|id| only.map_or(true, |set| set.contains(*id)))
                .filter_map(|id| self.registry.get(id))
                .filter(|h| eligible(operation, h))
                .collect();
            if handles.is_empty() {
                continue;
            }

            debug!(
                phase = phase.index,
                modules = handles.len(),
                "[Coordinator] Dispatching {} phase",
                operation
            );
            let race_cancel = policy != FailurePolicy::BestEffort;
            let results = join_all(
                handles
                    .into_iter()
                    .map(|h| self.invoke(operation, h, token, race_cancel)),
            )
            .await;

            let mut phase_failed = false;
            for result in results {
                if let Some(err) = &result.error {
                    phase_failed = true;
                    if err.is_cancellation() && token.is_cancelled() {
                        outcome.canceled = policy != FailurePolicy::BestEffort;
                    }
                    if outcome.first_error.is_none() {
                        outcome.first_error = Some(err.clone());
                    }
                }
                outcome.results.insert(result.module_id.clone(), result);
            }

            if outcome.canceled {
                break;
            }
            if phase_failed && policy == FailurePolicy::Abort {
                outcome.aborted = true;
                break;
            }
        }

        outcome
    }

    async fn invoke(
        &self,
        operation: LifecycleOperation,
        handle: ModuleHandle,
        token: &CancellationToken,
        race_cancel: bool,
    ) -> ModuleResult {
        let started = Instant::now();
        let id = handle.id.clone();
        self.transition(&handle, operation.transitional_state(), None);

        let ctx = ModuleContext::for_operation(operation, self.context.clone(), token.child_token());
        let guarded = self.guarded_hook(operation, handle.module.as_ref(), &id, &ctx);
        let outcome = if race_cancel {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(LifecycleError::ModuleCanceled {
                    module_id: id.clone(),
                    operation,
                }),
                r = guarded => r,
            }
        } else {
            guarded.await
        };

        let duration = started.elapsed();
        match outcome {
            Ok(()) => {
                self.transition(&handle, operation.target_state(), None);
                kernel_telemetry::log_module_event!(
                    debug,
                    "Coordinator",
                    "Hook completed",
                    id,
                    operation = %operation,
                    duration_ms = duration.as_millis() as u64
                );
                ModuleResult::succeeded(id, operation, duration)
            }
            Err(err) => {
                kernel_telemetry::record_module_failure(operation.label());
                kernel_telemetry::log_module_event!(
                    error,
                    "Coordinator",
                    "Hook failed",
                    id,
                    operation = %operation,
                    error = %err
                );
                self.transition(&handle, LifecycleState::Faulted, Some(err.to_string()));
                ModuleResult::failed(id, err, duration)
            }
        }
    }

    async fn guarded_hook(
        &self,
        operation: LifecycleOperation,
        module: &dyn Module,
        id: &ModuleId,
        ctx: &ModuleContext,
    ) -> Result<(), LifecycleError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| LifecycleError::HookFailed {
                module_id: id.clone(),
                operation,
                cause: "hook permits closed".to_string(),
            })?;
        let _timer = kernel_telemetry::HookTimer::new(operation.label());

        let call = AssertUnwindSafe(dispatch(module, operation, ctx)).catch_unwind();
        match tokio::time::timeout(self.module_timeout, call).await {
            Err(_) => Err(LifecycleError::ModuleTimeout {
                module_id: id.clone(),
                operation,
                timeout_ms: self.module_timeout.as_millis() as u64,
            }),
            Ok(Err(_)) => Err(LifecycleError::HookPanicked {
                module_id: id.clone(),
                operation,
            }),
            Ok(Ok(result)) => result.map_err(|e| hook_error(id, operation, e)),
        }
    }

    fn transition(&self, handle: &ModuleHandle, to: LifecycleState, reason: Option<String>) {
        let Some(from) = self.registry.set_state(&handle.id, to) else {
            return;
        };
        if from == to {
            return;
        }
        self.event_bus.send(KernelEvent::ModuleStateChanged {
            module_id: handle.id.clone(),
            name: handle.name.clone(),
            from,
            to,
            reason,
        });
    }
}

async fn dispatch(
    module: &dyn Module,
    operation: LifecycleOperation,
    ctx: &ModuleContext,
) -> Result<(), ModuleError> {
    match operation {
        LifecycleOperation::Initialize => module.on_initialize(ctx).await,
        LifecycleOperation::Start => module.on_start(ctx).await,
        LifecycleOperation::Stop => module.on_stop(ctx).await,
        LifecycleOperation::Shutdown => module.on_shutdown(ctx).await,
    }
}

fn hook_error(id: &ModuleId, operation: LifecycleOperation, err: ModuleError) -> LifecycleError {
    match (operation, err) {
        (_, ModuleError::Canceled) => LifecycleError::ModuleCanceled {
            module_id: id.clone(),
            operation,
        },
        (LifecycleOperation::Initialize, err) => LifecycleError::ModuleInitialization {
            module_id: id.clone(),
            cause: err.to_string(),
        },
        (_, err) => LifecycleError::HookFailed {
            module_id: id.clone(),
            operation,
            cause: err.to_string(),
        },
    }
}

/// Whether a module in its current state takes part in `operation`.
fn eligible(operation: LifecycleOperation, handle: &ModuleHandle) -> bool {
    use LifecycleState as S;
    let ok = match operation {
        LifecycleOperation::Initialize => handle.state == S::Created,
        LifecycleOperation::Start => matches!(handle.state, S::Initialized | S::Stopped),
        LifecycleOperation::Stop => handle.state == S::Running,
        LifecycleOperation::Shutdown => handle.state != S::Shutdown,
    };
    if !ok && handle.state == S::Faulted {
        warn!(
            module_id = %handle.id,
            "[Coordinator] Skipping faulted module during {}",
            operation
        );
    } else if !ok {
        debug!(
            module_id = %handle.id,
            state = %handle.state,
            "[Coordinator] Module not eligible for {}",
            operation
        );
    }
    ok
}
