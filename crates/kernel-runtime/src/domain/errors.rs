//! Engine-side error taxonomy.
//!
//! Hook failures are converted into these at the phase boundary and stored
//! in `ModuleResult`s; they never escape the coordinator as panics or raw
//! module errors.

use serde::{Deserialize, Serialize};
use shared_types::entities::{LifecycleOperation, LifecycleState, ModuleId};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleError {
    #[error("Module {module_id} failed to initialize: {cause}")]
    ModuleInitialization { module_id: ModuleId, cause: String },

    #[error("Module {module_id} timed out during {operation} after {timeout_ms}ms")]
    ModuleTimeout {
        module_id: ModuleId,
        operation: LifecycleOperation,
        timeout_ms: u64,
    },

    #[error("Module {module_id} canceled during {operation}")]
    ModuleCanceled {
        module_id: ModuleId,
        operation: LifecycleOperation,
    },

    #[error("Module {module_id} failed during {operation}: {cause}")]
    HookFailed {
        module_id: ModuleId,
        operation: LifecycleOperation,
        cause: String,
    },

    #[error("Module {module_id} panicked during {operation}")]
    HookPanicked {
        module_id: ModuleId,
        operation: LifecycleOperation,
    },

    #[error("Cannot {operation} from state {from}")]
    InvalidTransition {
        from: LifecycleState,
        operation: LifecycleOperation,
    },

    #[error("Module {0} is already registered")]
    DuplicateModule(ModuleId),

    #[error("Registration is closed once the engine has left Created (state: {state})")]
    RegistrationClosed { state: LifecycleState },

    /// The health probe itself failed, as opposed to reporting unhealthy.
    #[error("Health check of {module_id} failed: {cause}")]
    HealthCheck { module_id: ModuleId, cause: String },

    #[error("Operation canceled")]
    OperationCanceled,
}

impl LifecycleError {
    /// The module this error concerns, if any.
    pub fn module_id(&self) -> Option<&ModuleId> {
        match self {
            Self::ModuleInitialization { module_id, .. }
            | Self::ModuleTimeout { module_id, .. }
            | Self::ModuleCanceled { module_id, .. }
            | Self::HookFailed { module_id, .. }
            | Self::HookPanicked { module_id, .. }
            | Self::HealthCheck { module_id, .. } => Some(module_id),
            Self::DuplicateModule(module_id) => Some(module_id),
            Self::InvalidTransition { .. }
            | Self::RegistrationClosed { .. }
            | Self::OperationCanceled => None,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::ModuleCanceled { .. } | Self::OperationCanceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = LifecycleError::ModuleTimeout {
            module_id: ModuleId::from("db"),
            operation: LifecycleOperation::Start,
            timeout_ms: 1500,
        };
        assert_eq!(err.to_string(), "Module db timed out during start after 1500ms");

        let err = LifecycleError::InvalidTransition {
            from: LifecycleState::Created,
            operation: LifecycleOperation::Start,
        };
        assert_eq!(err.to_string(), "Cannot start from state Created");
    }

    #[test]
    fn test_module_id() {
        let err = LifecycleError::HookPanicked {
            module_id: ModuleId::from("cache"),
            operation: LifecycleOperation::Stop,
        };
        assert_eq!(err.module_id(), Some(&ModuleId::from("cache")));
        assert!(LifecycleError::OperationCanceled.module_id().is_none());
        assert!(LifecycleError::OperationCanceled.is_cancellation());
    }
}
