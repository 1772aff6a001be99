//! Engine domain: errors, results and the engine state machine.

pub mod errors;
pub mod results;
pub mod state_machine;

pub use errors::LifecycleError;
pub use results::{EngineDiagnostics, LifecycleResult, ModuleResult};
pub use state_machine::EngineStateMachine;
