//! # Module Trait - The Pluggable Component Contract
//!
//! Defines the contract that ALL modules must implement to be driven through
//! the kernel lifecycle.
//!
//! ## Lifecycle Hooks
//!
//! - `on_initialize` / `on_start` / `on_stop` / `on_shutdown`: one call per
//!   engine operation, bounded by the engine's per-module timeout.
//! - `on_get_health`: polled concurrently with every other module.
//! - `on_populate_diagnostics`: writes key/value diagnostics into a sink.
//!
//! Every hook receives a [`ModuleContext`] carrying the engine's execution
//! context name and a cancellation token. Long-running hooks should select
//! on [`ModuleContext::cancelled`] and return [`ModuleError::Canceled`].
//!
//! `on_shutdown` may be called more than once (rollback followed by an
//! explicit shutdown); implementations must be idempotent.
//!
//! ## Example Implementation
//!
//! ```rust,ignore
//! use shared_types::{Module, ModuleContext, ModuleError, ModuleId, PriorityConfig, PriorityLevel};
//! use async_trait::async_trait;
//!
//! pub struct CacheModule { id: ModuleId, priority: PriorityConfig }
//!
//! #[async_trait]
//! impl Module for CacheModule {
//!     fn id(&self) -> ModuleId { self.id.clone() }
//!     fn name(&self) -> &str { "Cache" }
//!     fn priority(&self) -> PriorityConfig { self.priority.clone() }
//!     async fn on_initialize(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> { Ok(()) }
//!     async fn on_start(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> { Ok(()) }
//!     async fn on_stop(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> { Ok(()) }
//!     async fn on_shutdown(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> { Ok(()) }
//! }
//! ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::diagnostics::DiagnosticsSink;
use crate::entities::{LifecycleOperation, ModuleId};
use crate::errors::ModuleError;
use crate::health::ModuleHealth;
use crate::priority::PriorityConfig;

/// Per-invocation context handed to every hook.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    operation: Option<LifecycleOperation>,
    context: String,
    cancellation: CancellationToken,
}

impl ModuleContext {
    /// Context for a lifecycle operation.
    pub fn for_operation(
        operation: LifecycleOperation,
        context: impl Into<String>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            operation: Some(operation),
            context: context.into(),
            cancellation,
        }
    }

    /// Context for a query (health, diagnostics) outside any operation.
    pub fn for_query(context: impl Into<String>, cancellation: CancellationToken) -> Self {
        Self {
            operation: None,
            context: context.into(),
            cancellation,
        }
    }

    /// The lifecycle operation being executed, `None` for queries.
    #[must_use]
    pub fn operation(&self) -> Option<LifecycleOperation> {
        self.operation
    }

    /// Execution context name (e.g. "Development", "Production").
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once the caller cancels the operation.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }

    /// Token for handing to background work spawned by the hook.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}

/// The core trait that ALL modules must implement.
#[async_trait]
pub trait Module: Send + Sync {
    /// Unique identifier for this module.
    fn id(&self) -> ModuleId;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Module version.
    fn version(&self) -> &str {
        "0.1.0"
    }

    /// Scheduling configuration. Read once at registration.
    fn priority(&self) -> PriorityConfig;

    /// Acquire resources and validate configuration.
    async fn on_initialize(&self, ctx: &ModuleContext) -> Result<(), ModuleError>;

    /// Begin processing (spawn background work, open listeners).
    async fn on_start(&self, ctx: &ModuleContext) -> Result<(), ModuleError>;

    /// Stop processing but keep resources.
    async fn on_stop(&self, ctx: &ModuleContext) -> Result<(), ModuleError>;

    /// Release everything. Must be idempotent.
    async fn on_shutdown(&self, ctx: &ModuleContext) -> Result<(), ModuleError>;

    /// Report current health. An `Err` is reported as unhealthy by the engine.
    async fn on_get_health(&self, _ctx: &ModuleContext) -> Result<ModuleHealth, ModuleError> {
        Ok(ModuleHealth::healthy("no health check implemented"))
    }

    /// Write module-specific diagnostics into `sink`.
    async fn on_populate_diagnostics(&self, _ctx: &ModuleContext, _sink: &mut DiagnosticsSink) {}
}
