//! Driven Ports (outbound dependencies of the monitor)

use async_trait::async_trait;
use shared_types::entities::LifecycleState;
use shared_types::health::EngineHealth;
use tokio_util::sync::CancellationToken;

use crate::domain::{MetricsSnapshot, MonitorError};

/// The engine as seen by the monitor.
///
/// The engine owns the monitor as one of its modules, so implementations
/// must not keep the engine alive; return [`MonitorError::SourceUnavailable`]
/// once it is gone.
#[async_trait]
pub trait EngineHealthSource: Send + Sync {
    fn engine_id(&self) -> Result<String, MonitorError>;

    fn engine_version(&self) -> Result<String, MonitorError>;

    fn engine_state(&self) -> Result<LifecycleState, MonitorError>;

    /// Aggregate health across every module.
    async fn engine_health(
        &self,
        cancellation: CancellationToken,
    ) -> Result<EngineHealth, MonitorError>;
}

/// Samples resource usage of the current process.
pub trait MetricsSampler: Send {
    fn sample(&mut self) -> Result<MetricsSnapshot, MonitorError>;
}
