//! Ports layer

pub mod inbound;
pub mod outbound;

pub use inbound::MonitorApi;
pub use outbound::{EngineHealthSource, MetricsSampler};
