//! Process metrics snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one metrics collection cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub collected_at: DateTime<Utc>,
    pub pid: u32,
    /// CPU usage since the previous refresh. May exceed 100 on multi-core hosts.
    pub cpu_percent: f32,
    pub memory_bytes: u64,
    pub virtual_memory_bytes: u64,
    /// `None` where the platform does not expose per-process threads.
    pub thread_count: Option<usize>,
    /// Open file descriptors / handles, where available.
    pub handle_count: Option<usize>,
    pub run_time_secs: u64,
}
