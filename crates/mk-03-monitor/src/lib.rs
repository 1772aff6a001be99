//! # MK-03: Monitor
//!
//! Health aggregation and diagnostics collection for the kernel.
//!
//! ## Architecture
//!
//! - **Domain**: `MonitorEvent`, bounded `EventLog`, `MetricsSnapshot`,
//!   `DashboardData`
//! - **Ports**: Inbound (`MonitorApi`), Outbound (`EngineHealthSource`,
//!   `MetricsSampler`)
//! - **Adapters**: `SysinfoSampler`
//! - **Application**: `Monitor`, which is itself a kernel [`shared_types::Module`]
//!
//! ## Background Work
//!
//! | Loop | Default period | Output |
//! |------|----------------|--------|
//! | Metrics | 5s | Latest `MetricsSnapshot`, process gauges |
//! | Health | 30s | Latest `EngineHealth`, one `HealthCheck` event |
//! | Bus listener | per event | One event per `KernelEvent` |
//!
//! Loops start on `on_start` and are cancelled on `on_stop` / `on_shutdown`.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::SysinfoSampler;
pub use application::{Monitor, MONITOR_MODULE_ID};
pub use config::MonitorConfig;
pub use domain::*;
pub use ports::{EngineHealthSource, MetricsSampler, MonitorApi};
