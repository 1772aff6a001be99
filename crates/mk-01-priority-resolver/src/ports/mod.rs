//! Ports for the Priority Resolver
//!
//! - Inbound: PriorityResolverApi (consumed by the lifecycle coordinator)

pub mod inbound;
