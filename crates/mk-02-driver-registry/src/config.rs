//! Configuration for the Driver Registry

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Registry configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Per-driver deadline for a health probe
    pub health_check_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            health_check_timeout_ms: 5_000,
        }
    }
}

impl RegistryConfig {
    #[must_use]
    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms.max(1))
    }
}
