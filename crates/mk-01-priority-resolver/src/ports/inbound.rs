//! Inbound Ports (Driving Ports / API)

use crate::domain::entities::PhasePlan;
use crate::domain::value_objects::PlanCandidate;
use shared_types::priority::PriorityConfig;

/// Primary Priority Resolver API
///
/// Pure and synchronous: the engine calls it while holding no locks.
pub trait PriorityResolverApi: Send + Sync {
    /// Effective priority of `config` under `context`.
    fn effective_priority(&self, config: &PriorityConfig, context: &str) -> i32;

    /// Partition `candidates` into ordered phases under `context`.
    fn plan(&self, candidates: &[PlanCandidate], context: &str) -> PhasePlan;
}
