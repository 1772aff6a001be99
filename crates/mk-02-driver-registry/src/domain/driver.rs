//! # Driver Contract
//!
//! Drivers are lower-level components tracked independently of the module
//! lifecycle. Each driver publishes its state through a
//! `tokio::sync::watch` channel; the registry watches it while the driver
//! is registered.
//!
//! Concrete drivers usually embed a [`DriverHandle`] and delegate the
//! identity and state methods to it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::entities::{DriverId, DriverState};
use tokio::sync::watch;

use super::errors::DriverError;

/// Result of a driver health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverHealth {
    pub healthy: bool,
    pub message: String,
}

impl DriverHealth {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            healthy: true,
            message: message.into(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: message.into(),
        }
    }
}

/// Contract every registered driver implements.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    fn id(&self) -> DriverId;

    fn name(&self) -> &str;

    /// Declared driver type (e.g. "serial", "gpio"). Informational; typed
    /// lookup uses the Rust type.
    fn driver_type(&self) -> &str;

    fn state(&self) -> DriverState;

    /// Receiver of state changes. Every call returns a fresh receiver.
    fn subscribe_state(&self) -> watch::Receiver<DriverState>;

    /// Probe the driver. `Err` means the probe itself failed.
    async fn check_health(&self) -> Result<DriverHealth, DriverError>;
}

/// Identity and state channel shared by concrete drivers.
#[derive(Debug)]
pub struct DriverHandle {
    id: DriverId,
    name: String,
    driver_type: String,
    state: watch::Sender<DriverState>,
}

impl DriverHandle {
    pub fn new(
        id: impl Into<DriverId>,
        name: impl Into<String>,
        driver_type: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(DriverState::Created);
        Self {
            id: id.into(),
            name: name.into(),
            driver_type: driver_type.into(),
            state,
        }
    }

    #[must_use]
    pub fn id(&self) -> DriverId {
        self.id.clone()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn driver_type(&self) -> &str {
        &self.driver_type
    }

    #[must_use]
    pub fn state(&self) -> DriverState {
        *self.state.borrow()
    }

    /// Move to `state`, notifying watchers. Returns the previous state.
    /// Setting the current state again notifies nobody.
    pub fn set_state(&self, state: DriverState) -> DriverState {
        let mut previous = state;
        self.state.send_if_modified(|current| {
            previous = *current;
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
        previous
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DriverState> {
        self.state.subscribe()
    }
}
