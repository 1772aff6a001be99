//! Configuration for the Monitor
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `KERNEL_MONITOR_METRICS_INTERVAL_SECS` | `5` | Process metrics period |
//! | `KERNEL_MONITOR_HEALTH_INTERVAL_SECS` | `30` | Engine health check period |
//! | `KERNEL_MONITOR_EVENT_CAPACITY` | `1000` | Retained events |
//! | `KERNEL_MONITOR_DASHBOARD_EVENTS` | `50` | Events included in dashboard reads |

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::{MonitorError, DEFAULT_EVENT_CAPACITY};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub metrics_interval_secs: u64,
    pub health_check_interval_secs: u64,
    pub event_capacity: usize,
    pub dashboard_event_count: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            metrics_interval_secs: 5,
            health_check_interval_secs: 30,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            dashboard_event_count: 50,
        }
    }
}

impl MonitorConfig {
    /// Defaults overlaid with `KERNEL_MONITOR_*` variables. Unparseable
    /// values keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            metrics_interval_secs: env_or(
                "KERNEL_MONITOR_METRICS_INTERVAL_SECS",
                defaults.metrics_interval_secs,
            ),
            health_check_interval_secs: env_or(
                "KERNEL_MONITOR_HEALTH_INTERVAL_SECS",
                defaults.health_check_interval_secs,
            ),
            event_capacity: env_or("KERNEL_MONITOR_EVENT_CAPACITY", defaults.event_capacity),
            dashboard_event_count: env_or(
                "KERNEL_MONITOR_DASHBOARD_EVENTS",
                defaults.dashboard_event_count,
            ),
        }
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.metrics_interval_secs == 0 {
            return Err(MonitorError::InvalidConfig(
                "metrics_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.health_check_interval_secs == 0 {
            return Err(MonitorError::InvalidConfig(
                "health_check_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(MonitorError::InvalidConfig(
                "event_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_interval_secs.max(1))
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs.max(1))
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
