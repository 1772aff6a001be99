//! # MK-01: Priority Resolver
//!
//! Computes a deterministic, context-sensitive ordering key for every
//! module and partitions modules into ordered phases for the lifecycle
//! coordinator.
//!
//! ## Architecture
//!
//! - **Domain**: Plan entities (Phase, PhasePlan), boundary policy, invariants
//! - **Algorithms**: Effective priority, phase planner
//! - **Ports**: Inbound (PriorityResolverApi)
//! - **Application**: PriorityResolver service
//!
//! ## Phase Rules
//!
//! | Situation | Result |
//! |-----------|--------|
//! | Different effective priority | Separate phases, ascending |
//! | Equal priority, both parallel-eligible | Same phase |
//! | `can_parallel_initialize = false` | Singleton phase (barrier) |
//! | Equal priority and flags | Registration order |

pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use algorithms::{effective_level, effective_priority, plan_phases};
pub use application::service::PriorityResolver;
pub use config::ResolverConfig;
pub use domain::entities::*;
pub use domain::errors::ResolverError;
pub use domain::value_objects::*;
pub use ports::inbound::PriorityResolverApi;
