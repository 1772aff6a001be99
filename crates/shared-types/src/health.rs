//! # Health Types
//!
//! Health reported by modules and aggregated by the engine and the monitor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::entities::{LifecycleState, ModuleId};

/// Health classification, ordered from best to worst.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum HealthStatus {
    Healthy,
    Warning,
    Unhealthy,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Healthy => "Healthy",
            Self::Warning => "Warning",
            Self::Unhealthy => "Unhealthy",
            Self::Critical => "Critical",
        };
        f.write_str(name)
    }
}

/// Health reported by a single module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleHealth {
    pub status: HealthStatus,
    pub message: String,
    pub data: BTreeMap<String, serde_json::Value>,
}

impl ModuleHealth {
    pub fn new(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn healthy(message: impl Into<String>) -> Self {
        Self::new(HealthStatus::Healthy, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(HealthStatus::Warning, message)
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(HealthStatus::Unhealthy, message)
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(HealthStatus::Critical, message)
    }

    /// Attach a data point to the report.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// One module's entry in an engine health report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleHealthEntry {
    pub module_id: ModuleId,
    pub name: String,
    pub state: LifecycleState,
    pub health: ModuleHealth,
}

/// Aggregated engine health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineHealth {
    pub engine_state: LifecycleState,
    /// True iff the engine is `Running` and at least one module is healthy.
    pub is_healthy: bool,
    pub healthy: usize,
    pub warning: usize,
    pub unhealthy: usize,
    pub critical: usize,
    pub modules: Vec<ModuleHealthEntry>,
    pub checked_at: DateTime<Utc>,
}

impl EngineHealth {
    /// Aggregate module entries into an engine report.
    pub fn aggregate(engine_state: LifecycleState, modules: Vec<ModuleHealthEntry>) -> Self {
        let count = |status: HealthStatus| {
            modules
                .iter()
                .filter(|entry| entry.health.status == status)
                .count()
        };

        let healthy = count(HealthStatus::Healthy);
        let warning = count(HealthStatus::Warning);
        let unhealthy = count(HealthStatus::Unhealthy);
        let critical = count(HealthStatus::Critical);

        Self {
            engine_state,
            is_healthy: engine_state == LifecycleState::Running && healthy > 0,
            healthy,
            warning,
            unhealthy,
            critical,
            modules,
            checked_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.modules.len()
    }

    /// Worst status across all modules, `Healthy` when there are none.
    #[must_use]
    pub fn worst_status(&self) -> HealthStatus {
        self.modules
            .iter()
            .map(|entry| entry.health.status)
            .max()
            .unwrap_or(HealthStatus::Healthy)
    }
}
