//! Lifecycle and diagnostics result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::entities::{LifecycleOperation, LifecycleState, ModuleId};
use shared_types::ModuleDiagnostics;
use std::collections::BTreeMap;
use std::time::Duration;

use super::errors::LifecycleError;
use crate::config::EngineConfig;

/// Outcome of one module hook invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleResult {
    pub module_id: ModuleId,
    pub success: bool,
    pub message: String,
    pub duration: Duration,
    pub error: Option<LifecycleError>,
}

impl ModuleResult {
    pub fn succeeded(module_id: ModuleId, operation: LifecycleOperation, duration: Duration) -> Self {
        Self {
            message: format!("{operation} completed"),
            module_id,
            success: true,
            duration,
            error: None,
        }
    }

    pub fn failed(module_id: ModuleId, error: LifecycleError, duration: Duration) -> Self {
        Self {
            module_id,
            success: false,
            message: error.to_string(),
            duration,
            error: Some(error),
        }
    }
}

/// Aggregate outcome of one engine-level operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleResult {
    pub operation: LifecycleOperation,
    pub success: bool,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// First failure, or the reason the operation was rejected or canceled.
    pub error: Option<LifecycleError>,
    /// One entry per module whose hook was invoked.
    pub module_results: BTreeMap<ModuleId, ModuleResult>,
    /// Hooks run as cleanup for this operation: rollback shutdowns after an
    /// aborted Initialize, or the stop pass before shutting down a running
    /// engine.
    pub cleanup_results: BTreeMap<ModuleId, ModuleResult>,
    /// Engine state once the operation finished.
    pub final_state: LifecycleState,
}

impl LifecycleResult {
    /// Result of an operation refused before any hook ran.
    pub fn rejected(
        operation: LifecycleOperation,
        error: LifecycleError,
        state: LifecycleState,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            operation,
            success: false,
            message: error.to_string(),
            started_at,
            duration: Duration::ZERO,
            error: Some(error),
            module_results: BTreeMap::new(),
            cleanup_results: BTreeMap::new(),
            final_state: state,
        }
    }

    /// Successful no-op, e.g. shutting down an engine that is already down.
    pub fn skipped(
        operation: LifecycleOperation,
        state: LifecycleState,
        started_at: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            success: true,
            message: message.into(),
            started_at,
            duration: Duration::ZERO,
            error: None,
            module_results: BTreeMap::new(),
            cleanup_results: BTreeMap::new(),
            final_state: state,
        }
    }

    pub fn module(&self, id: &ModuleId) -> Option<&ModuleResult> {
        self.module_results.get(id)
    }

    /// Modules whose hook failed, in id order.
    pub fn failed_modules(&self) -> Vec<ModuleId> {
        self.module_results
            .values()
            .filter(|r| !r.success)
            .map(|r| r.module_id.clone())
            .collect()
    }

    pub fn succeeded_count(&self) -> usize {
        self.module_results.values().filter(|r| r.success).count()
    }
}

/// Snapshot returned by `KernelEngine::diagnostics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineDiagnostics {
    pub engine_id: String,
    pub engine_name: String,
    pub version: String,
    pub state: LifecycleState,
    pub context: String,
    pub uptime: Duration,
    pub config: EngineConfig,
    /// Phase plan rendered as `[a] -> [b, c]`.
    pub phase_plan: String,
    pub last_results: BTreeMap<String, LifecycleResult>,
    pub modules: Vec<ModuleDiagnostics>,
    pub collected_at: DateTime<Utc>,
}
