//! Domain invariants for phase plans
//!
//! Checked by the planner in debug builds and by the property tests.

use super::entities::PhasePlan;
use super::value_objects::PlanCandidate;
use shared_types::entities::ModuleId;
use std::collections::{HashMap, HashSet};

/// Every candidate appears in exactly one phase, and nothing else does.
pub fn invariant_exact_cover(plan: &PhasePlan, candidates: &[PlanCandidate]) -> bool {
    let planned = plan.flatten();
    if planned.len() != candidates.len() {
        return false;
    }

    let unique: HashSet<&ModuleId> = planned.iter().collect();
    if unique.len() != planned.len() {
        return false;
    }

    candidates.iter().all(|c| unique.contains(&c.module_id))
}

/// Multi-member phases only hold parallel-eligible modules of equal
/// effective priority.
pub fn invariant_parallel_phases(
    plan: &PhasePlan,
    candidates: &[PlanCandidate],
    effective: impl Fn(&PlanCandidate) -> i32,
) -> bool {
    let by_id: HashMap<&ModuleId, &PlanCandidate> =
        candidates.iter().map(|c| (&c.module_id, c)).collect();

    plan.phases().iter().all(|phase| {
        if !phase.is_parallel() {
            return true;
        }
        phase.modules().iter().all(|id| {
            by_id.get(id).is_some_and(|c| {
                c.priority.can_parallel_initialize()
                    && effective(c) == phase.effective_priority()
            })
        })
    })
}

/// Phase priorities never decrease.
pub fn invariant_non_decreasing(plan: &PhasePlan) -> bool {
    plan.phases()
        .windows(2)
        .all(|w| w[0].effective_priority <= w[1].effective_priority)
}
