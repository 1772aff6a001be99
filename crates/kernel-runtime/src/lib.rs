//! # Kernel Runtime
//!
//! The engine that owns registered modules and drives them through
//! Initialize / Start / Stop / Shutdown, plus the host binary's wiring.
//!
//! ## Layout
//!
//! - `config` - `EngineConfig` (defaults + environment)
//! - `domain` - lifecycle errors, results, the engine state machine
//! - `registry` - the module table
//! - `coordinator` - phase execution with timeouts, cancellation and the
//!   concurrency bound
//! - `engine` - `KernelEngine`, the public surface
//! - `adapters` - monitor health source, in-memory document store
//! - `demo` - modules registered by the host binary

#![allow(clippy::module_name_repetitions)]

pub mod adapters;
pub mod config;
pub mod coordinator;
pub mod demo;
pub mod domain;
pub mod engine;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, EngineConfig};
pub use coordinator::{FailurePolicy, LifecycleCoordinator, PlanOutcome};
pub use domain::{EngineDiagnostics, EngineStateMachine, LifecycleError, LifecycleResult, ModuleResult};
pub use engine::KernelEngine;
pub use registry::{ModuleHandle, ModuleRegistry};
