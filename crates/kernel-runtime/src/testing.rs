//! Scriptable module used by the engine tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::entities::{LifecycleOperation, ModuleId};
use shared_types::health::ModuleHealth;
use shared_types::priority::{PriorityConfig, PriorityLevel};
use shared_types::{DiagnosticsSink, Module, ModuleContext, ModuleError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a hook does when invoked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
    /// Never returns on its own.
    Hang,
    /// Waits for the cancellation signal, then reports `Canceled`.
    AwaitCancel,
    Delay(Duration),
}

/// Journal of hook invocations shared between modules, as `"id:operation"`.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Tracks how many hooks are in flight at once.
#[derive(Debug, Default)]
pub struct Concurrency {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Concurrency {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct TestModule {
    id: ModuleId,
    priority: PriorityConfig,
    behaviors: HashMap<LifecycleOperation, Behavior>,
    health: Option<ModuleHealth>,
    health_behavior: Behavior,
    log: CallLog,
    concurrency: Option<Arc<Concurrency>>,
}

impl TestModule {
    pub fn new(id: &str, level: PriorityLevel) -> Self {
        Self {
            id: ModuleId::from(id),
            priority: PriorityConfig::at_level(level),
            behaviors: HashMap::new(),
            health: None,
            health_behavior: Behavior::Succeed,
            log: CallLog::default(),
            concurrency: None,
        }
    }

    /// Same level, parallel-eligible.
    pub fn parallel(id: &str, level: PriorityLevel) -> Self {
        let priority = PriorityConfig::builder(level)
            .parallel(true)
            .build()
            .expect("valid priority");
        Self::new(id, level).with_priority(priority)
    }

    pub fn with_priority(mut self, priority: PriorityConfig) -> Self {
        self.priority = priority;
        self
    }

    pub fn on(mut self, operation: LifecycleOperation, behavior: Behavior) -> Self {
        self.behaviors.insert(operation, behavior);
        self
    }

    pub fn with_health(mut self, health: ModuleHealth) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_health_behavior(mut self, behavior: Behavior) -> Self {
        self.health_behavior = behavior;
        self
    }

    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn with_concurrency(mut self, concurrency: &Arc<Concurrency>) -> Self {
        self.concurrency = Some(concurrency.clone());
        self
    }

    pub fn into_arc(self) -> Arc<dyn Module> {
        Arc::new(self)
    }

    async fn run(&self, operation: LifecycleOperation, ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.log.lock().push(format!("{}:{}", self.id, operation));
        let behavior = self
            .behaviors
            .get(&operation)
            .copied()
            .unwrap_or(Behavior::Succeed);

        if let Some(c) = &self.concurrency {
            c.enter();
        }
        let result = perform(behavior, ctx, &self.id).await;
        if let Some(c) = &self.concurrency {
            c.exit();
        }
        result
    }
}

async fn perform(behavior: Behavior, ctx: &ModuleContext, id: &ModuleId) -> Result<(), ModuleError> {
    match behavior {
        Behavior::Succeed => Ok(()),
        Behavior::Fail => Err(ModuleError::failed(format!("{id} refused"))),
        Behavior::Panic => panic!("{id} exploded"),
        Behavior::Hang => {
            std::future::pending::<()>().await;
            Ok(())
        }
        Behavior::AwaitCancel => {
            ctx.cancelled().await;
            Err(ModuleError::Canceled)
        }
        Behavior::Delay(d) => {
            tokio::time::sleep(d).await;
            Ok(())
        }
    }
}

#[async_trait]
impl Module for TestModule {
    fn id(&self) -> ModuleId {
        self.id.clone()
    }

    fn name(&self) -> &str {
        self.id.as_str()
    }

    fn priority(&self) -> PriorityConfig {
        self.priority.clone()
    }

    async fn on_initialize(&self, ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.run(LifecycleOperation::Initialize, ctx).await
    }

    async fn on_start(&self, ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.run(LifecycleOperation::Start, ctx).await
    }

    async fn on_stop(&self, ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.run(LifecycleOperation::Stop, ctx).await
    }

    async fn on_shutdown(&self, ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.run(LifecycleOperation::Shutdown, ctx).await
    }

    async fn on_get_health(&self, ctx: &ModuleContext) -> Result<ModuleHealth, ModuleError> {
        perform(self.health_behavior, ctx, &self.id).await?;
        Ok(self
            .health
            .clone()
            .unwrap_or_else(|| ModuleHealth::healthy("ok")))
    }

    async fn on_populate_diagnostics(&self, ctx: &ModuleContext, sink: &mut DiagnosticsSink) {
        if perform(self.health_behavior, ctx, &self.id).await.is_ok() {
            sink.record("calls", self.log.lock().len());
        }
    }
}
