//! # Shared Types Crate
//!
//! This crate contains the module contract, lifecycle states, priority
//! configuration and health/diagnostics types used across the kernel.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **One Canonical Contract**: Modules implement exactly one trait,
//!   [`Module`], consumed by the lifecycle coordinator.
//! - **Compile-time Ranges**: Priority levels carry their own base offsets.

pub mod diagnostics;
pub mod entities;
pub mod errors;
pub mod health;
pub mod module_trait;
pub mod persistence;
pub mod priority;

pub use diagnostics::{DiagnosticsSink, ModuleDiagnostics};
pub use entities::*;
pub use errors::*;
pub use health::{EngineHealth, HealthStatus, ModuleHealth, ModuleHealthEntry};
pub use module_trait::{Module, ModuleContext};
pub use persistence::DocumentStore;
pub use priority::{PriorityConfig, PriorityConfigBuilder, PriorityLevel};
