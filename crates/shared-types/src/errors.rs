//! # Error Types
//!
//! Errors produced by module code and the persistence collaborator.
//! Engine-side errors live in `kernel-runtime`.

use thiserror::Error;

/// Errors returned from module lifecycle hooks.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModuleError {
    /// Hook failed for a module-specific reason.
    #[error("{0}")]
    Failed(String),

    /// A storage collaborator failed; propagated unmodified.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// The hook observed the cancellation signal and aborted.
    #[error("Operation canceled")]
    Canceled,

    /// A collaborator the module relies on is unavailable.
    #[error("Dependency {dependency} unavailable: {reason}")]
    Dependency { dependency: String, reason: String },
}

impl ModuleError {
    /// Shorthand for [`ModuleError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors raised by a document store connection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// Could not establish or keep the connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connection attempt exceeded its deadline.
    #[error("Connection timed out after {timeout_ms}ms")]
    ConnectionTimeout { timeout_ms: u64 },

    /// Credentials were rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),
}

/// Invalid priority configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PriorityConfigError {
    #[error("Sub-priority {value} out of range (max {max})")]
    SubPriorityOutOfRange { value: u32, max: u8 },

    #[error("Invalid weight: {0}")]
    InvalidWeight(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_error_converts_into_module_error() {
        let err: ModuleError = PersistenceError::ConnectionTimeout { timeout_ms: 500 }.into();
        assert_eq!(
            err.to_string(),
            "Persistence error: Connection timed out after 500ms"
        );
        assert!(matches!(
            err,
            ModuleError::Persistence(PersistenceError::ConnectionTimeout { .. })
        ));
    }

    #[test]
    fn test_module_error_display() {
        let err = ModuleError::Dependency {
            dependency: "document-store".to_string(),
            reason: "not connected".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Dependency document-store unavailable: not connected"
        );
        assert_eq!(ModuleError::failed("boom").to_string(), "boom");
    }
}
