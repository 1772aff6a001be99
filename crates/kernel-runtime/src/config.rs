//! # Engine Configuration
//!
//! Defaults overlaid with environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `KERNEL_ENGINE_NAME` | `microkernel` | Display name |
//! | `KERNEL_CONTEXT` | `Production` | Execution context for priority adjustments |
//! | `KERNEL_CONTINUE_ON_FAILURE` | `false` | Keep executing the plan after a module fails |
//! | `KERNEL_MODULE_TIMEOUT_SECS` | `120` | Per-module hook deadline |
//! | `KERNEL_HEALTH_TIMEOUT_SECS` | `10` | Per-module health/diagnostics deadline |
//! | `KERNEL_MAX_PARALLELISM` | `32` | Concurrent hook invocations, engine-wide |
//! | `KERNEL_LEVEL_BOUNDARY_POLICY` | `clamp` | `clamp` or `allow` |

use mk_01_priority_resolver::LevelBoundaryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("Execution context must not be empty")]
    EmptyContext,
}

/// Complete engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub engine_id: String,
    pub engine_name: String,
    pub version: String,
    /// Execution context name, matched case-insensitively against module
    /// context adjustments.
    pub context: String,
    pub continue_on_module_failure: bool,
    pub module_timeout_secs: u64,
    pub health_check_timeout_secs: u64,
    pub max_parallelism: usize,
    pub boundary_policy: LevelBoundaryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_id: uuid::Uuid::new_v4().to_string(),
            engine_name: "microkernel".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            context: "Production".to_string(),
            continue_on_module_failure: false,
            module_timeout_secs: 120,
            health_check_timeout_secs: 10,
            max_parallelism: 32,
            boundary_policy: LevelBoundaryPolicy::Clamp,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("KERNEL_ENGINE_NAME") {
            config.engine_name = name;
        }
        if let Ok(context) = std::env::var("KERNEL_CONTEXT") {
            config.context = context;
        }
        if let Ok(val) = std::env::var("KERNEL_CONTINUE_ON_FAILURE") {
            config.continue_on_module_failure = val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Some(secs) = parse_env("KERNEL_MODULE_TIMEOUT_SECS") {
            config.module_timeout_secs = secs;
        }
        if let Some(secs) = parse_env("KERNEL_HEALTH_TIMEOUT_SECS") {
            config.health_check_timeout_secs = secs;
        }
        if let Some(n) = parse_env("KERNEL_MAX_PARALLELISM") {
            config.max_parallelism = n;
        }
        if let Ok(policy) = std::env::var("KERNEL_LEVEL_BOUNDARY_POLICY") {
            match policy.parse() {
                Ok(policy) => config.boundary_policy = policy,
                Err(e) => warn!("[Config] {}, keeping {}", e, config.boundary_policy),
            }
        }

        config
    }

    /// Builder-style context override.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    #[must_use]
    pub fn with_continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_module_failure = continue_on_failure;
        self
    }

    #[must_use]
    pub fn with_module_timeout(mut self, timeout: Duration) -> Self {
        self.module_timeout_secs = timeout.as_secs();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.trim().is_empty() {
            return Err(ConfigError::EmptyContext);
        }
        if self.module_timeout_secs == 0 {
            return Err(ConfigError::Zero {
                field: "module_timeout_secs",
            });
        }
        if self.health_check_timeout_secs == 0 {
            return Err(ConfigError::Zero {
                field: "health_check_timeout_secs",
            });
        }
        if self.max_parallelism == 0 {
            return Err(ConfigError::Zero {
                field: "max_parallelism",
            });
        }
        Ok(())
    }

    pub fn module_timeout(&self) -> Duration {
        Duration::from_secs(self.module_timeout_secs)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("[Config] Ignoring unparseable {}={}", key, raw);
            None
        }
    }
}
