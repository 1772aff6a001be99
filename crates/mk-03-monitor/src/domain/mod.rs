//! Domain module for the Monitor

pub mod dashboard;
pub mod errors;
pub mod event;
pub mod event_log;
pub mod metrics;

pub use dashboard::{DashboardData, ModuleStatus};
pub use errors::MonitorError;
pub use event::{category, EventSeverity, MonitorEvent};
pub use event_log::{EventLog, DEFAULT_EVENT_CAPACITY};
pub use metrics::MetricsSnapshot;
