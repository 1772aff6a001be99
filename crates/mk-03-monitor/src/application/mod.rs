//! Application layer

pub mod service;

pub use service::{Monitor, MONITOR_MODULE_ID};
