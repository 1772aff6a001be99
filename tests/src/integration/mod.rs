//! Cross-crate integration scenarios.

pub mod support;

mod lifecycle;
mod monitoring;
mod properties;
