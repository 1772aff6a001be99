//! Driver registry service

pub mod registry;

pub use registry::DriverRegistry;
