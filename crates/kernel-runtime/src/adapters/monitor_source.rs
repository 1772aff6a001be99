//! Engine-backed health source for the monitor.
//!
//! The monitor is registered with the engine, so it only holds a weak
//! reference back. Once the engine is dropped every query reports
//! `SourceUnavailable`.

use async_trait::async_trait;
use mk_03_monitor::{EngineHealthSource, MonitorError};
use shared_types::entities::LifecycleState;
use shared_types::health::EngineHealth;
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;

use crate::engine::KernelEngine;

pub struct EngineMonitorSource {
    engine: Weak<KernelEngine>,
}

impl EngineMonitorSource {
    pub fn new(engine: &Arc<KernelEngine>) -> Self {
        Self {
            engine: Arc::downgrade(engine),
        }
    }

    fn engine(&self) -> Result<Arc<KernelEngine>, MonitorError> {
        self.engine.upgrade().ok_or(MonitorError::SourceUnavailable)
    }
}

#[async_trait]
impl EngineHealthSource for EngineMonitorSource {
    fn engine_id(&self) -> Result<String, MonitorError> {
        Ok(self.engine()?.id().to_string())
    }

    fn engine_version(&self) -> Result<String, MonitorError> {
        Ok(self.engine()?.version().to_string())
    }

    fn engine_state(&self) -> Result<LifecycleState, MonitorError> {
        Ok(self.engine()?.state())
    }

    async fn engine_health(
        &self,
        cancellation: CancellationToken,
    ) -> Result<EngineHealth, MonitorError> {
        let engine = self.engine()?;
        Ok(engine.health(&cancellation).await)
    }
}
