//! `sysinfo`-backed process sampler.
//!
//! Keeps one `System` alive between cycles: CPU usage is computed from the
//! delta between two refreshes, so the first sample after creation reports
//! 0%.

use chrono::Utc;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::domain::{MetricsSnapshot, MonitorError};
use crate::ports::MetricsSampler;

pub struct SysinfoSampler {
    system: System,
    pid: Pid,
}

impl SysinfoSampler {
    /// Sampler for the current process.
    pub fn current() -> Result<Self, MonitorError> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| MonitorError::MetricsConversion(e.to_string()))?;
        Ok(Self::for_pid(pid))
    }

    pub fn for_pid(pid: Pid) -> Self {
        Self {
            system: System::new(),
            pid,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid.as_u32()
    }
}

impl MetricsSampler for SysinfoSampler {
    fn sample(&mut self) -> Result<MetricsSnapshot, MonitorError> {
        // Only refresh the monitored process
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);

        let process = self
            .system
            .process(self.pid)
            .ok_or(MonitorError::ProcessNotFound(self.pid.as_u32()))?;

        let snapshot = MetricsSnapshot {
            collected_at: Utc::now(),
            pid: self.pid.as_u32(),
            cpu_percent: process.cpu_usage(),
            memory_bytes: process.memory(),
            virtual_memory_bytes: process.virtual_memory(),
            thread_count: process.tasks().map(|tasks| tasks.len()),
            handle_count: open_handle_count(self.pid),
            run_time_secs: process.run_time(),
        };

        if !snapshot.cpu_percent.is_finite() {
            return Err(MonitorError::MetricsConversion(format!(
                "non-finite cpu usage {}",
                snapshot.cpu_percent
            )));
        }

        Ok(snapshot)
    }
}

#[cfg(target_os = "linux")]
fn open_handle_count(pid: Pid) -> Option<usize> {
    std::fs::read_dir(format!("/proc/{}/fd", pid.as_u32()))
        .ok()
        .map(|entries| entries.count())
}

#[cfg(not(target_os = "linux"))]
fn open_handle_count(_pid: Pid) -> Option<usize> {
    None
}
