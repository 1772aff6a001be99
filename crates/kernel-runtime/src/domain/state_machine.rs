//! # Engine State Machine
//!
//! ```text
//! Created ──Initialize──► Initializing ──ok──► Initialized
//! Initialized | Stopped ──Start──► Starting ──ok──► Running
//! Running ──Stop──► Stopping ──ok──► Stopped
//! any non-terminal ──Shutdown──► ShuttingDown ──► Shutdown
//! aborted Initialize/Start/Stop ──► Faulted
//! ```
//!
//! `Faulted` only accepts Shutdown. Shutdown of a `Shutdown` engine is a
//! no-op and reported by [`EngineStateMachine::is_shut_down`] rather than
//! as an invalid transition.

use shared_types::entities::{LifecycleOperation, LifecycleState};

use super::errors::LifecycleError;

#[derive(Debug, Clone)]
pub struct EngineStateMachine {
    state: LifecycleState,
}

impl EngineStateMachine {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Created,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_shut_down(&self) -> bool {
        self.state == LifecycleState::Shutdown
    }

    /// Whether `operation` may start from `from`.
    pub fn can_begin(from: LifecycleState, operation: LifecycleOperation) -> bool {
        use LifecycleState as S;
        match operation {
            LifecycleOperation::Initialize => from == S::Created,
            LifecycleOperation::Start => matches!(from, S::Initialized | S::Stopped),
            LifecycleOperation::Stop => from == S::Running,
            LifecycleOperation::Shutdown => !matches!(from, S::Shutdown | S::ShuttingDown),
        }
    }

    /// Enter the transitional state of `operation`. Returns the previous state.
    pub fn begin(&mut self, operation: LifecycleOperation) -> Result<LifecycleState, LifecycleError> {
        let from = self.state;
        if !Self::can_begin(from, operation) {
            return Err(LifecycleError::InvalidTransition { from, operation });
        }
        self.state = operation.transitional_state();
        Ok(from)
    }

    /// Leave the transitional state. Shutdown always completes; other
    /// operations end in `Faulted` when aborted. Returns the new state.
    pub fn complete(&mut self, operation: LifecycleOperation, aborted: bool) -> LifecycleState {
        self.state = if aborted && operation != LifecycleOperation::Shutdown {
            LifecycleState::Faulted
        } else {
            operation.target_state()
        };
        self.state
    }
}

impl Default for EngineStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
