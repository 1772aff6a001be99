//! # Kernel Events
//!
//! Defines all event types that flow through the shared bus. The engine,
//! the driver registry and any other publisher emit these; the monitor is
//! the main consumer.

use serde::{Deserialize, Serialize};
use shared_types::entities::{DriverId, DriverState, LifecycleOperation, LifecycleState, ModuleId};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KernelEvent {
    // =========================================================================
    // ENGINE
    // =========================================================================
    /// The engine state machine moved.
    EngineStateChanged {
        engine_id: String,
        from: LifecycleState,
        to: LifecycleState,
    },

    /// An engine-level operation finished (successfully or not).
    LifecycleCompleted {
        engine_id: String,
        operation: LifecycleOperation,
        success: bool,
        duration_ms: u64,
        /// Modules whose hook failed during the operation.
        failed_modules: Vec<ModuleId>,
    },

    // =========================================================================
    // MODULES
    // =========================================================================
    /// A module changed lifecycle state.
    ModuleStateChanged {
        module_id: ModuleId,
        name: String,
        from: LifecycleState,
        to: LifecycleState,
        /// Failure reason when `to` is `Faulted`.
        reason: Option<String>,
    },

    // =========================================================================
    // DRIVERS
    // =========================================================================
    /// A driver was added to the registry.
    DriverRegistered {
        driver_id: DriverId,
        name: String,
        driver_type: String,
    },

    /// A driver was removed from the registry.
    DriverUnregistered { driver_id: DriverId, name: String },

    /// A registered driver reported a new state.
    DriverStateChanged {
        driver_id: DriverId,
        name: String,
        from: DriverState,
        to: DriverState,
    },
}

impl KernelEvent {
    /// Get the topic for this event.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::EngineStateChanged { .. } => EventTopic::Engine,
            Self::LifecycleCompleted { .. } => EventTopic::Lifecycle,
            Self::ModuleStateChanged { .. } => EventTopic::Module,
            Self::DriverRegistered { .. }
            | Self::DriverUnregistered { .. }
            | Self::DriverStateChanged { .. } => EventTopic::Driver,
        }
    }

    /// The module this event concerns, if any.
    #[must_use]
    pub fn module_id(&self) -> Option<&ModuleId> {
        match self {
            Self::ModuleStateChanged { module_id, .. } => Some(module_id),
            _ => None,
        }
    }

    /// Short event name used as the monitor's event type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::EngineStateChanged { .. } => "EngineStateChanged",
            Self::LifecycleCompleted { .. } => "LifecycleCompleted",
            Self::ModuleStateChanged { .. } => "ModuleStateChanged",
            Self::DriverRegistered { .. } => "DriverRegistered",
            Self::DriverUnregistered { .. } => "DriverUnregistered",
            Self::DriverStateChanged { .. } => "DriverStateChanged",
        }
    }
}

/// Event topics for filtering subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Engine state machine events.
    Engine,
    /// Completed lifecycle operations.
    Lifecycle,
    /// Per-module state changes.
    Module,
    /// Driver registry events.
    Driver,
    /// All events (wildcard).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include (empty = all topics).
    pub topics: Vec<EventTopic>,

    /// Only module events for these modules (empty = all modules).
    pub module_ids: Vec<ModuleId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            module_ids: Vec::new(),
        }
    }

    /// Create a filter for events about specific modules.
    #[must_use]
    pub fn for_modules(module_ids: Vec<ModuleId>) -> Self {
        Self {
            topics: vec![EventTopic::Module],
            module_ids,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &KernelEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let module_match = self.module_ids.is_empty()
            || event
                .module_id()
                .is_some_and(|id| self.module_ids.contains(id));

        topic_match && module_match
    }
}
