//! # Lifecycle Properties
//!
//! Randomised module sets run through a real engine on a current-thread
//! runtime.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use kernel_runtime::{EngineConfig, KernelEngine};
    use proptest::prelude::*;
    use shared_types::entities::{LifecycleOperation as Op, LifecycleState, ModuleId};
    use shared_types::priority::{PriorityConfig, PriorityLevel};
    use tokio_util::sync::CancellationToken;

    use crate::integration::support::{Journal, ScriptedModule};

    /// `(level index, parallel, fails on initialize)` per module.
    type Shape = (usize, bool, bool);

    fn arb_shapes() -> impl Strategy<Value = Vec<Shape>> {
        prop::collection::vec((0usize..6, any::<bool>(), prop::bool::weighted(0.2)), 1..10)
    }

    fn build(shapes: &[Shape], continue_on_failure: bool, journal: &Journal) -> KernelEngine {
        let engine = KernelEngine::new(
            EngineConfig::default().with_continue_on_failure(continue_on_failure),
        )
        .unwrap();
        for (i, (level, parallel, fails)) in shapes.iter().enumerate() {
            let priority = PriorityConfig::builder(PriorityLevel::all()[*level])
                .parallel(*parallel)
                .build()
                .unwrap();
            let mut module = ScriptedModule::new(&format!("m{i}"), priority, journal);
            if *fails {
                module = module.failing_on(Op::Initialize);
            }
            engine.register(Arc::new(module)).unwrap();
        }
        engine
    }

    fn failing(shapes: &[Shape]) -> BTreeSet<ModuleId> {
        shapes
            .iter()
            .enumerate()
            .filter(|(_, (_, _, fails))| *fails)
            .map(|(i, _)| ModuleId::new(format!("m{i}")))
            .collect()
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn initialize_follows_phase_order(shapes in arb_shapes()) {
            let journal = Journal::default();
            let engine = build(&shapes, true, &journal);
            let plan = engine.phase_plan();
            let result = runtime().block_on(engine.initialize(&CancellationToken::new()));

            let phases: Vec<usize> = journal
                .calls(Op::Initialize)
                .iter()
                .map(|m| plan.phase_of(&ModuleId::new(m.clone())).unwrap())
                .collect();
            prop_assert_eq!(phases.len(), shapes.len());
            prop_assert!(phases.windows(2).all(|w| w[0] <= w[1]));

            let failed: BTreeSet<ModuleId> = result.failed_modules().into_iter().collect();
            prop_assert_eq!(failed, failing(&shapes));
            prop_assert_eq!(engine.state(), LifecycleState::Initialized);
        }

        #[test]
        fn abort_never_reaches_later_phases(shapes in arb_shapes()) {
            let journal = Journal::default();
            let engine = build(&shapes, false, &journal);
            let plan = engine.phase_plan();
            let result = runtime().block_on(engine.initialize(&CancellationToken::new()));

            let failing = failing(&shapes);
            let first_failed_phase = failing
                .iter()
                .filter_map(|id| plan.phase_of(id))
                .min();

            match first_failed_phase {
                None => {
                    prop_assert!(result.success);
                    prop_assert_eq!(engine.state(), LifecycleState::Initialized);
                }
                Some(limit) => {
                    prop_assert!(!result.success);
                    prop_assert_eq!(engine.state(), LifecycleState::Faulted);

                    let initialized = journal.calls(Op::Initialize);
                    for id in plan.flatten() {
                        let phase = plan.phase_of(&id).unwrap();
                        prop_assert_eq!(
                            initialized.contains(&id.as_str().to_string()),
                            phase <= limit
                        );
                    }

                    // Everything that initialized cleanly is rolled back
                    let rolled_back: BTreeSet<String> =
                        journal.calls(Op::Shutdown).into_iter().collect();
                    let expected: BTreeSet<String> = initialized
                        .into_iter()
                        .filter(|m| !failing.contains(&ModuleId::new(m.clone())))
                        .collect();
                    prop_assert_eq!(rolled_back, expected);
                }
            }
        }
    }
}
