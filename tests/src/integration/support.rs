//! Scriptable module shared by the integration scenarios.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::entities::{LifecycleOperation, ModuleId};
use shared_types::priority::{PriorityConfig, PriorityLevel};
use shared_types::{Module, ModuleContext, ModuleError};
use std::sync::Arc;
use tokio::sync::Barrier;

/// Hook invocations in call order, as `(module, operation)`.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<(String, LifecycleOperation)>>>);

impl Journal {
    pub fn record(&self, module: &str, operation: LifecycleOperation) {
        self.0.lock().push((module.to_string(), operation));
    }

    /// Modules that saw `operation`, in call order.
    pub fn calls(&self, operation: LifecycleOperation) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|(_, op)| *op == operation)
            .map(|(m, _)| m.clone())
            .collect()
    }

    pub fn invoked(&self, module: &str, operation: LifecycleOperation) -> bool {
        self.0
            .lock()
            .iter()
            .any(|(m, op)| m == module && *op == operation)
    }
}

pub struct ScriptedModule {
    id: String,
    priority: PriorityConfig,
    fail_on: Option<LifecycleOperation>,
    /// Hooks of `rendezvous_on` wait here before returning.
    rendezvous: Option<Arc<Barrier>>,
    rendezvous_on: Option<LifecycleOperation>,
    journal: Journal,
}

impl ScriptedModule {
    pub fn new(id: &str, priority: PriorityConfig, journal: &Journal) -> Self {
        Self {
            id: id.to_string(),
            priority,
            fail_on: None,
            rendezvous: None,
            rendezvous_on: None,
            journal: journal.clone(),
        }
    }

    pub fn at(id: &str, level: PriorityLevel, journal: &Journal) -> Self {
        Self::new(id, PriorityConfig::at_level(level), journal)
    }

    pub fn parallel(id: &str, level: PriorityLevel, journal: &Journal) -> Self {
        let priority = PriorityConfig::builder(level)
            .parallel(true)
            .build()
            .expect("valid priority");
        Self::new(id, priority, journal)
    }

    pub fn failing_on(mut self, operation: LifecycleOperation) -> Self {
        self.fail_on = Some(operation);
        self
    }

    pub fn meeting_at(mut self, operation: LifecycleOperation, barrier: &Arc<Barrier>) -> Self {
        self.rendezvous_on = Some(operation);
        self.rendezvous = Some(barrier.clone());
        self
    }

    async fn hook(&self, operation: LifecycleOperation) -> Result<(), ModuleError> {
        self.journal.record(&self.id, operation);
        if self.rendezvous_on == Some(operation) {
            if let Some(barrier) = &self.rendezvous {
                barrier.wait().await;
            }
        }
        if self.fail_on == Some(operation) {
            return Err(ModuleError::failed(format!("{} failed {operation}", self.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl Module for ScriptedModule {
    fn id(&self) -> ModuleId {
        ModuleId::new(self.id.clone())
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> PriorityConfig {
        self.priority.clone()
    }

    async fn on_initialize(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.hook(LifecycleOperation::Initialize).await
    }

    async fn on_start(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.hook(LifecycleOperation::Start).await
    }

    async fn on_stop(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.hook(LifecycleOperation::Stop).await
    }

    async fn on_shutdown(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.hook(LifecycleOperation::Shutdown).await
    }
}
