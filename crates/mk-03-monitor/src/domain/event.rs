//! # Monitor Events
//!
//! Immutable records kept in the monitor's bounded log. Events come from
//! three places: the kernel event bus, the periodic health check and
//! explicit [`crate::Monitor::log_event`] calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_bus::KernelEvent;
use shared_types::entities::{DriverState, LifecycleState, ModuleId};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Event severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Critical => "Critical",
        };
        f.write_str(name)
    }
}

/// Well-known event categories.
pub mod category {
    pub const ENGINE: &str = "engine";
    pub const LIFECYCLE: &str = "lifecycle";
    pub const MODULE: &str = "module";
    pub const DRIVER: &str = "driver";
    pub const HEALTH: &str = "health";
}

/// A single monitor log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub category: String,
    pub severity: EventSeverity,
    pub title: String,
    pub message: String,
    pub module_id: Option<ModuleId>,
    pub data: BTreeMap<String, serde_json::Value>,
}

impl MonitorEvent {
    pub fn new(
        event_type: impl Into<String>,
        category: impl Into<String>,
        severity: EventSeverity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type: event_type.into(),
            category: category.into(),
            severity,
            title: title.into(),
            message: message.into(),
            module_id: None,
            data: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_module(mut self, module_id: ModuleId) -> Self {
        self.module_id = Some(module_id);
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Translate a bus event into a log entry.
    pub fn from_kernel_event(event: &KernelEvent) -> Self {
        let event_type = event.name();
        match event {
            KernelEvent::EngineStateChanged { engine_id, from, to } => {
                let severity = state_severity(*to);
                Self::new(
                    event_type,
                    category::ENGINE,
                    severity,
                    "Engine state changed",
                    format!("{from} -> {to}"),
                )
                .with_data("engine_id", engine_id.clone().into())
            }
            KernelEvent::LifecycleCompleted {
                engine_id,
                operation,
                success,
                duration_ms,
                failed_modules,
            } => {
                let severity = if *success {
                    EventSeverity::Info
                } else {
                    EventSeverity::Error
                };
                let message = if *success {
                    format!("{} completed in {}ms", operation.label(), duration_ms)
                } else {
                    format!(
                        "{} failed in {}ms ({} module(s) failed)",
                        operation.label(),
                        duration_ms,
                        failed_modules.len()
                    )
                };
                let failed: Vec<serde_json::Value> = failed_modules
                    .iter()
                    .map(|id| id.as_str().into())
                    .collect();
                Self::new(
                    event_type,
                    category::LIFECYCLE,
                    severity,
                    format!("Lifecycle {}", operation.label()),
                    message,
                )
                .with_data("engine_id", engine_id.clone().into())
                .with_data("duration_ms", (*duration_ms).into())
                .with_data("failed_modules", failed.into())
            }
            KernelEvent::ModuleStateChanged {
                module_id,
                name,
                from,
                to,
                reason,
            } => {
                let mut message = format!("{name}: {from} -> {to}");
                if let Some(reason) = reason {
                    message.push_str(&format!(" ({reason})"));
                }
                Self::new(
                    event_type,
                    category::MODULE,
                    state_severity(*to),
                    "Module state changed",
                    message,
                )
                .with_module(module_id.clone())
            }
            KernelEvent::DriverRegistered {
                driver_id,
                name,
                driver_type,
            } => Self::new(
                event_type,
                category::DRIVER,
                EventSeverity::Info,
                "Driver registered",
                format!("{name} ({driver_type})"),
            )
            .with_data("driver_id", driver_id.as_str().into()),
            KernelEvent::DriverUnregistered { driver_id, name } => Self::new(
                event_type,
                category::DRIVER,
                EventSeverity::Info,
                "Driver unregistered",
                name.clone(),
            )
            .with_data("driver_id", driver_id.as_str().into()),
            KernelEvent::DriverStateChanged {
                driver_id,
                name,
                from,
                to,
            } => {
                let severity = if *to == DriverState::Error {
                    EventSeverity::Error
                } else {
                    EventSeverity::Info
                };
                Self::new(
                    event_type,
                    category::DRIVER,
                    severity,
                    "Driver state changed",
                    format!("{name}: {from} -> {to}"),
                )
                .with_data("driver_id", driver_id.as_str().into())
            }
        }
    }
}

fn state_severity(state: LifecycleState) -> EventSeverity {
    if state == LifecycleState::Faulted {
        EventSeverity::Error
    } else {
        EventSeverity::Info
    }
}
