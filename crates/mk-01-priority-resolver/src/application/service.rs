//! Priority Resolver Service
//!
//! Main service implementing PriorityResolverApi.

use crate::algorithms::{effective_priority, plan_phases};
use crate::config::ResolverConfig;
use crate::domain::entities::PhasePlan;
use crate::domain::value_objects::{LevelBoundaryPolicy, PlanCandidate};
use crate::ports::inbound::PriorityResolverApi;
use shared_types::priority::PriorityConfig;

use tracing::debug;

/// Priority Resolver
///
/// Stateless apart from its configuration; cheap to clone and share.
#[derive(Debug, Clone, Default)]
pub struct PriorityResolver {
    config: ResolverConfig,
}

impl PriorityResolver {
    /// Create a resolver with default config (clamping policy)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with custom config
    pub fn with_config(config: ResolverConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn boundary_policy(&self) -> LevelBoundaryPolicy {
        self.config.boundary_policy
    }
}

impl PriorityResolverApi for PriorityResolver {
    fn effective_priority(&self, config: &PriorityConfig, context: &str) -> i32 {
        effective_priority(config, context, self.config.boundary_policy)
    }

    fn plan(&self, candidates: &[PlanCandidate], context: &str) -> PhasePlan {
        let plan = plan_phases(candidates, context, self.config.boundary_policy);

        debug!(
            context = context,
            modules = plan.module_count(),
            phases = plan.len(),
            max_parallelism = plan.max_parallelism(),
            policy = %self.config.boundary_policy,
            "[Resolver] Phase plan resolved: {}",
            plan
        );

        plan
    }
}
