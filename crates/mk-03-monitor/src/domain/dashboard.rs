//! Aggregate monitoring read model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::entities::{LifecycleState, ModuleId};
use shared_types::health::{HealthStatus, ModuleHealthEntry};

use super::event::MonitorEvent;
use super::metrics::MetricsSnapshot;

/// Per-module row of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleStatus {
    pub id: ModuleId,
    pub name: String,
    pub state: LifecycleState,
    pub health_status: HealthStatus,
    pub message: String,
}

impl From<&ModuleHealthEntry> for ModuleStatus {
    fn from(entry: &ModuleHealthEntry) -> Self {
        Self {
            id: entry.module_id.clone(),
            name: entry.name.clone(),
            state: entry.state,
            health_status: entry.health.status,
            message: entry.health.message.clone(),
        }
    }
}

/// Everything a dashboard needs in one read.
///
/// Module health reflects the latest completed health cycle and `metrics`
/// the latest completed metrics cycle; neither is re-sampled on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardData {
    pub engine_id: String,
    pub version: String,
    pub state: LifecycleState,
    /// `None` until the first health cycle completes.
    pub is_healthy: Option<bool>,
    pub health_checked_at: Option<DateTime<Utc>>,
    pub modules: Vec<ModuleStatus>,
    pub recent_events: Vec<MonitorEvent>,
    pub metrics: Option<MetricsSnapshot>,
    pub generated_at: DateTime<Utc>,
}
