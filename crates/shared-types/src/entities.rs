//! # Core Domain Entities
//!
//! Identity and lifecycle state types shared by the engine, the resolver,
//! the driver registry and the monitor.
//!
//! ## Lifecycle
//!
//! ```text
//! Created ──Initialize──→ Initializing ──ok──→ Initialized
//! Initialized ──Start──→ Starting ──ok──→ Running
//! Running ──Stop──→ Stopping ──ok──→ Stopped
//! (any non-terminal) ──Shutdown──→ ShuttingDown ──→ Shutdown
//! (any phase failure) ──→ Faulted
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::priority::PriorityConfig;

/// Unique identifier of a registered module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(String);

impl ModuleId {
    /// Create a module id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ModuleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Unique identifier of a registered driver.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DriverId(String);

impl DriverId {
    /// Create a driver id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DriverId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Lifecycle state shared by the engine and every module it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Registered, no hook has run yet.
    Created,
    /// `on_initialize` in flight.
    Initializing,
    /// `on_initialize` succeeded.
    Initialized,
    /// `on_start` in flight.
    Starting,
    /// `on_start` succeeded.
    Running,
    /// `on_stop` in flight.
    Stopping,
    /// `on_stop` succeeded.
    Stopped,
    /// `on_shutdown` in flight.
    ShuttingDown,
    /// Terminal state.
    Shutdown,
    /// A lifecycle hook failed, timed out or was canceled.
    Faulted,
}

impl LifecycleState {
    /// Terminal states accept no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Shutdown)
    }

    /// True while a hook is in flight.
    #[must_use]
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            Self::Initializing | Self::Starting | Self::Stopping | Self::ShuttingDown
        )
    }

    /// Get the state name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Initializing => "Initializing",
            Self::Initialized => "Initialized",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::ShuttingDown => "ShuttingDown",
            Self::Shutdown => "Shutdown",
            Self::Faulted => "Faulted",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The four engine-level lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleOperation {
    Initialize,
    Start,
    Stop,
    Shutdown,
}

impl LifecycleOperation {
    /// Lowercase label used in logs and metric labels.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Shutdown => "shutdown",
        }
    }

    /// State entered while the operation runs.
    #[must_use]
    pub fn transitional_state(&self) -> LifecycleState {
        match self {
            Self::Initialize => LifecycleState::Initializing,
            Self::Start => LifecycleState::Starting,
            Self::Stop => LifecycleState::Stopping,
            Self::Shutdown => LifecycleState::ShuttingDown,
        }
    }

    /// State entered when the operation succeeds.
    #[must_use]
    pub fn target_state(&self) -> LifecycleState {
        match self {
            Self::Initialize => LifecycleState::Initialized,
            Self::Start => LifecycleState::Running,
            Self::Stop => LifecycleState::Stopped,
            Self::Shutdown => LifecycleState::Shutdown,
        }
    }

    /// All operations in lifecycle order.
    #[must_use]
    pub fn all() -> [LifecycleOperation; 4] {
        [Self::Initialize, Self::Start, Self::Stop, Self::Shutdown]
    }
}

impl fmt::Display for LifecycleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Driver runtime state, reported through the driver's watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverState {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
    Error,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "Created",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Error => "Error",
        };
        f.write_str(name)
    }
}

/// Read-only view of a registered module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Unique identifier.
    pub id: ModuleId,
    /// Human-readable name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// Current lifecycle state.
    pub state: LifecycleState,
    /// Declared priority.
    pub priority: PriorityConfig,
    /// Effective priority under the engine's context.
    pub effective_priority: i32,
    /// Position in registration order.
    pub registration_index: usize,
}
