//! Phase Planning Algorithm
//!
//! 1. Compute the effective priority of every candidate under the context.
//! 2. Stable-sort by `(effective_priority, registration_index)`.
//! 3. Within one effective priority, every parallel-eligible candidate
//!    joins a single phase, placed where its earliest-registered member
//!    sorts. Every other candidate is a barrier and gets a phase of its own.
//!
//! O(n log n), deterministic for a given candidate list and context.

use crate::algorithms::effective_priority::effective_priority;
use crate::domain::entities::{Phase, PhasePlan};
use crate::domain::invariants;
use crate::domain::value_objects::{LevelBoundaryPolicy, PlanCandidate};
use shared_types::entities::ModuleId;

/// Partition `candidates` into ordered phases.
///
/// An empty candidate list yields an empty plan.
pub fn plan_phases(
    candidates: &[PlanCandidate],
    context: &str,
    policy: LevelBoundaryPolicy,
) -> PhasePlan {
    // 1-2. Key and sort (sort_by_key is stable)
    let mut keyed: Vec<(i32, &PlanCandidate)> = candidates
        .iter()
        .map(|c| (effective_priority(&c.priority, context, policy), c))
        .collect();
    keyed.sort_by_key(|(priority, c)| (*priority, c.registration_index));

    // 3. Walk each equal-priority run
    let mut phases: Vec<Phase> = Vec::new();
    for run in keyed.chunk_by(|a, b| a.0 == b.0) {
        let priority = run[0].0;
        let parallel_group: Vec<ModuleId> = run
            .iter()
            .filter(|(_, c)| c.priority.can_parallel_initialize())
            .map(|(_, c)| c.module_id.clone())
            .collect();
        let mut group_emitted = false;

        for (_, candidate) in run {
            if !candidate.priority.can_parallel_initialize() {
                phases.push(Phase::new(
                    phases.len(),
                    priority,
                    vec![candidate.module_id.clone()],
                ));
            } else if !group_emitted {
                phases.push(Phase::new(phases.len(), priority, parallel_group.clone()));
                group_emitted = true;
            }
        }
    }

    let plan = PhasePlan::new(context, phases);

    debug_assert!(invariants::invariant_exact_cover(&plan, candidates));
    debug_assert!(invariants::invariant_non_decreasing(&plan));
    debug_assert!(invariants::invariant_parallel_phases(
        &plan,
        candidates,
        |c| effective_priority(&c.priority, context, policy)
    ));

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::priority::{PriorityConfig, PriorityLevel};

    fn candidate(id: &str, level: PriorityLevel, sub: u32, parallel: bool, index: usize) -> PlanCandidate {
        let priority = PriorityConfig::builder(level)
            .sub_priority(sub)
            .parallel(parallel)
            .build()
            .unwrap();
        PlanCandidate::new(id, priority, index)
    }

    fn names(plan: &PhasePlan) -> Vec<Vec<String>> {
        plan.phases()
            .iter()
            .map(|p| p.modules().iter().map(|m| m.as_str().to_string()).collect())
            .collect()
    }

    /// A(Critical, barrier), B and C (Infrastructure, parallel)
    /// Expected: [[A], [B, C]]
    #[test]
    fn test_barrier_then_parallel_pair() {
        let candidates = vec![
            candidate("A", PriorityLevel::Critical, 0, false, 0),
            candidate("B", PriorityLevel::Infrastructure, 0, true, 1),
            candidate("C", PriorityLevel::Infrastructure, 0, true, 2),
        ];

        let plan = plan_phases(&candidates, "Production", LevelBoundaryPolicy::Clamp);

        assert_eq!(names(&plan), vec![vec!["A"], vec!["B", "C"]]);
        assert_eq!(plan.phases()[1].effective_priority(), 100);
        assert!(plan.phases()[1].is_parallel());
    }

    #[test]
    fn test_empty_plan() {
        let plan = plan_phases(&[], "Production", LevelBoundaryPolicy::Clamp);
        assert!(plan.is_empty());
        assert_eq!(plan.context, "Production");
    }

    #[test]
    fn test_equal_priority_barriers_are_singletons() {
        let candidates = vec![
            candidate("x", PriorityLevel::Core, 5, false, 0),
            candidate("y", PriorityLevel::Core, 5, false, 1),
        ];

        let plan = plan_phases(&candidates, "Production", LevelBoundaryPolicy::Clamp);

        assert_eq!(names(&plan), vec![vec!["x"], vec!["y"]]);
    }

    #[test]
    fn test_different_priorities_split_parallel_modules() {
        let candidates = vec![
            candidate("late", PriorityLevel::Service, 1, true, 0),
            candidate("early", PriorityLevel::Service, 0, true, 1),
        ];

        let plan = plan_phases(&candidates, "Production", LevelBoundaryPolicy::Clamp);

        assert_eq!(names(&plan), vec![vec!["early"], vec!["late"]]);
    }

    #[test]
    fn test_registration_order_breaks_ties() {
        let candidates = vec![
            candidate("second", PriorityLevel::Feature, 0, false, 7),
            candidate("first", PriorityLevel::Feature, 0, false, 3),
        ];

        let plan = plan_phases(&candidates, "Production", LevelBoundaryPolicy::Clamp);

        assert_eq!(names(&plan), vec![vec!["first"], vec!["second"]]);
    }

    /// p1(par), b(barrier), p2(par) all at the same priority.
    /// The parallel pair stays together at p1's position; the barrier
    /// follows in its own phase.
    #[test]
    fn test_parallel_group_spans_interleaved_barrier() {
        let candidates = vec![
            candidate("p1", PriorityLevel::Core, 0, true, 0),
            candidate("b", PriorityLevel::Core, 0, false, 1),
            candidate("p2", PriorityLevel::Core, 0, true, 2),
        ];

        let plan = plan_phases(&candidates, "Production", LevelBoundaryPolicy::Clamp);

        assert_eq!(names(&plan), vec![vec!["p1", "p2"], vec!["b"]]);
    }

    #[test]
    fn test_barrier_before_parallel_group() {
        let candidates = vec![
            candidate("b", PriorityLevel::Core, 0, false, 0),
            candidate("p1", PriorityLevel::Core, 0, true, 1),
            candidate("p2", PriorityLevel::Core, 0, true, 2),
        ];

        let plan = plan_phases(&candidates, "Production", LevelBoundaryPolicy::Clamp);

        assert_eq!(names(&plan), vec![vec!["b"], vec!["p1", "p2"]]);
    }

    #[test]
    fn test_context_reorders_with_allow_policy() {
        let db = PlanCandidate::new(
            "db",
            PriorityConfig::builder(PriorityLevel::Infrastructure)
                .adjust("Development", -150)
                .build()
                .unwrap(),
            0,
        );
        let logger = candidate("logger", PriorityLevel::Critical, 10, false, 1);
        let candidates = vec![db, logger];

        let clamped = plan_phases(&candidates, "Development", LevelBoundaryPolicy::Clamp);
        assert_eq!(names(&clamped), vec![vec!["logger"], vec!["db"]]);

        let allowed = plan_phases(&candidates, "Development", LevelBoundaryPolicy::Allow);
        assert_eq!(names(&allowed), vec![vec!["db"], vec!["logger"]]);
        assert_eq!(allowed.phases()[0].effective_priority(), -50);
    }

    #[test]
    fn test_phase_indices_are_sequential() {
        let candidates = vec![
            candidate("a", PriorityLevel::Critical, 0, false, 0),
            candidate("b", PriorityLevel::Core, 0, true, 1),
            candidate("c", PriorityLevel::Core, 0, true, 2),
            candidate("d", PriorityLevel::Monitoring, 0, false, 3),
        ];

        let plan = plan_phases(&candidates, "Production", LevelBoundaryPolicy::Clamp);

        let indices: Vec<usize> = plan.phases().iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(plan.module_count(), 4);
    }
}
