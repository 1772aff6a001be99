//! # Lifecycle Scenarios
//!
//! The engine driven end to end: phase ordering, both failure policies,
//! rollback and the level boundary policy.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use kernel_runtime::{EngineConfig, KernelEngine, LifecycleError};
    use mk_01_priority_resolver::LevelBoundaryPolicy;
    use shared_bus::{EventFilter, KernelEvent};
    use shared_types::entities::{LifecycleOperation as Op, LifecycleState, ModuleId};
    use shared_types::priority::{PriorityConfig, PriorityLevel};
    use tokio::sync::Barrier;
    use tokio_util::sync::CancellationToken;

    use crate::integration::support::{Journal, ScriptedModule};

    // =========================================================================
    // FIXTURES
    // =========================================================================

    fn engine(continue_on_failure: bool) -> KernelEngine {
        let config = EngineConfig::default()
            .with_continue_on_failure(continue_on_failure)
            .with_module_timeout(Duration::from_secs(2));
        KernelEngine::new(config).unwrap()
    }

    /// A(Critical, barrier), then B and C (Infrastructure, parallel). B fails
    /// to initialize; B and C only return once both have been invoked.
    fn register_abc(engine: &KernelEngine, journal: &Journal) {
        let together = Arc::new(Barrier::new(2));
        engine
            .register(Arc::new(ScriptedModule::at("A", PriorityLevel::Critical, journal)))
            .unwrap();
        engine
            .register(Arc::new(
                ScriptedModule::parallel("B", PriorityLevel::Infrastructure, journal)
                    .failing_on(Op::Initialize)
                    .meeting_at(Op::Initialize, &together),
            ))
            .unwrap();
        engine
            .register(Arc::new(
                ScriptedModule::parallel("C", PriorityLevel::Infrastructure, journal)
                    .meeting_at(Op::Initialize, &together),
            ))
            .unwrap();
    }

    fn id(s: &str) -> ModuleId {
        ModuleId::from(s)
    }

    // =========================================================================
    // FAILURE POLICY
    // =========================================================================

    #[tokio::test]
    async fn test_failing_parallel_peer_does_not_stop_its_phase() {
        let engine = engine(true);
        let journal = Journal::default();
        register_abc(&engine, &journal);

        assert_eq!(engine.phase_plan().to_string(), "[A] -> [B, C]");
        let result = engine.initialize(&CancellationToken::new()).await;

        assert!(!result.success);
        assert!(result.module(&id("A")).unwrap().success);
        assert!(result.module(&id("C")).unwrap().success);
        let b = result.module(&id("B")).unwrap();
        assert!(!b.success);
        // A timeout here would mean B and C never overlapped
        assert!(matches!(
            b.error,
            Some(LifecycleError::ModuleInitialization { .. })
        ));
        assert_eq!(journal.calls(Op::Initialize), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_abort_never_invokes_later_phases_and_rolls_back() {
        let engine = engine(false);
        let journal = Journal::default();
        register_abc(&engine, &journal);
        engine
            .register(Arc::new(ScriptedModule::at("D", PriorityLevel::Core, &journal)))
            .unwrap();

        let result = engine.initialize(&CancellationToken::new()).await;

        assert!(!result.success);
        assert_eq!(result.final_state, LifecycleState::Faulted);
        assert!(!journal.invoked("D", Op::Initialize));
        assert_eq!(journal.calls(Op::Shutdown), vec!["C", "A"]);
        assert!(!journal.invoked("B", Op::Shutdown));

        let shutdown = engine.shutdown(&CancellationToken::new()).await;
        assert_eq!(shutdown.final_state, LifecycleState::Shutdown);
        // Remaining modules are torn down; the rolled-back ones are not repeated
        assert_eq!(journal.calls(Op::Shutdown), vec!["C", "A", "D", "B"]);
    }

    #[tokio::test]
    async fn test_failure_reported_on_the_bus() {
        let engine = engine(true);
        let journal = Journal::default();
        register_abc(&engine, &journal);
        let mut b_events = engine.subscribe(EventFilter::for_modules(vec![id("B")]));

        engine.initialize(&CancellationToken::new()).await;

        let mut transitions = Vec::new();
        while let Ok(Some(event)) = b_events.try_recv() {
            if let KernelEvent::ModuleStateChanged { to, reason, .. } = event {
                transitions.push((to, reason.is_some()));
            }
        }
        assert_eq!(
            transitions,
            vec![
                (LifecycleState::Initializing, false),
                (LifecycleState::Faulted, true),
            ]
        );
    }

    // =========================================================================
    // ORDERING
    // =========================================================================

    #[tokio::test]
    async fn test_levels_start_ascending_and_stop_descending() {
        let engine = engine(false);
        let journal = Journal::default();
        for (name, level) in [
            ("monitoring", PriorityLevel::Monitoring),
            ("feature", PriorityLevel::Feature),
            ("critical", PriorityLevel::Critical),
            ("service", PriorityLevel::Service),
        ] {
            engine
                .register(Arc::new(ScriptedModule::at(name, level, &journal)))
                .unwrap();
        }
        let token = CancellationToken::new();

        engine.initialize(&token).await;
        engine.start(&token).await;
        engine.stop(&token).await;
        engine.start(&token).await;
        let shutdown = engine.shutdown(&token).await;

        assert!(shutdown.success);
        let ascending = vec!["critical", "service", "feature", "monitoring"];
        let descending: Vec<_> = ascending.iter().rev().copied().collect();
        assert_eq!(journal.calls(Op::Initialize), ascending);
        assert_eq!(journal.calls(Op::Start)[..4], ascending[..]);
        assert_eq!(journal.calls(Op::Start)[4..], ascending[..]);
        // One explicit stop, then the stop pass inside shutdown
        assert_eq!(journal.calls(Op::Stop)[..4], descending[..]);
        assert_eq!(journal.calls(Op::Stop)[4..], descending[..]);
        assert_eq!(journal.calls(Op::Shutdown), descending);
    }

    #[tokio::test]
    async fn test_boundary_policy_decides_cross_level_adjustments() {
        let promoted = |journal: &Journal| {
            ScriptedModule::new(
                "promoted",
                PriorityConfig::builder(PriorityLevel::Infrastructure)
                    .adjust("Development", -150)
                    .build()
                    .unwrap(),
                journal,
            )
        };

        for (policy, expected) in [
            (LevelBoundaryPolicy::Clamp, "[root] -> [promoted]"),
            (LevelBoundaryPolicy::Allow, "[promoted] -> [root]"),
        ] {
            let journal = Journal::default();
            let mut config = EngineConfig::default().with_context("Development");
            config.boundary_policy = policy;
            let engine = KernelEngine::new(config).unwrap();
            engine
                .register(Arc::new(ScriptedModule::at("root", PriorityLevel::Critical, &journal)))
                .unwrap();
            engine.register(Arc::new(promoted(&journal))).unwrap();

            assert_eq!(engine.phase_plan().to_string(), expected, "{policy}");
        }
    }

    #[tokio::test]
    async fn test_shutdown_twice_is_harmless() {
        let engine = engine(false);
        let journal = Journal::default();
        engine
            .register(Arc::new(ScriptedModule::at("only", PriorityLevel::Core, &journal)))
            .unwrap();
        let token = CancellationToken::new();
        engine.initialize(&token).await;

        let first = engine.shutdown(&token).await;
        let second = engine.shutdown(&token).await;

        assert!(first.success && second.success);
        assert_eq!(journal.calls(Op::Shutdown), vec!["only"]);
        assert_eq!(
            engine.last_result(Op::Shutdown).unwrap().module_results.len(),
            1
        );
    }
}
