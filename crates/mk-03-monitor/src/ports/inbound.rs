//! Driving Ports (API exposed to hosts and dashboards)

use async_trait::async_trait;

use crate::domain::{DashboardData, MetricsSnapshot, MonitorEvent};

/// Query and logging surface of the monitor.
#[async_trait]
pub trait MonitorApi: Send + Sync {
    /// Append an event to the bounded log.
    fn log_event(&self, event: MonitorEvent);

    /// The `n` most recent events, newest first.
    fn recent_events(&self, n: usize) -> Vec<MonitorEvent>;

    /// Every retained event, oldest first.
    fn all_events(&self) -> Vec<MonitorEvent>;

    /// Snapshot stored by the latest completed metrics cycle.
    fn latest_metrics(&self) -> Option<MetricsSnapshot>;

    /// Engine, module, event and metrics data in one read.
    async fn dashboard_data(&self) -> DashboardData;
}
