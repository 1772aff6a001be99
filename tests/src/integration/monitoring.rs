//! # Monitoring Scenarios
//!
//! Engine, monitor and driver registry sharing one event bus. Time is
//! paused so the monitor's intervals elapse instantly.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use kernel_runtime::demo::{CacheModule, ClockDriver, DriversModule};
    use kernel_runtime::{EngineConfig, KernelEngine};
    use mk_02_driver_registry::DriverRegistry;
    use mk_03_monitor::{category, EventSeverity, Monitor, MonitorConfig, MONITOR_MODULE_ID};
    use shared_bus::InMemoryEventBus;
    use shared_types::entities::{DriverState, LifecycleState, ModuleId};
    use tokio_util::sync::CancellationToken;

    struct Stack {
        engine: Arc<KernelEngine>,
        monitor: Arc<Monitor>,
        drivers: Arc<DriverRegistry>,
    }

    fn stack() -> Stack {
        let bus = Arc::new(InMemoryEventBus::new());
        let engine = Arc::new(
            KernelEngine::with_event_bus(EngineConfig::default(), bus.clone()).unwrap(),
        );
        let drivers = Arc::new(DriverRegistry::new().with_event_bus(bus.clone()));
        drivers.register(Arc::new(ClockDriver::new("clock0"))).unwrap();
        let monitor = Arc::new(
            Monitor::new(MonitorConfig::default())
                .unwrap()
                .with_event_bus(bus),
        );

        engine
            .register(Arc::new(DriversModule::new(drivers.clone())))
            .unwrap();
        engine.register(Arc::new(CacheModule::cache())).unwrap();
        engine.register_monitor(monitor.clone()).unwrap();

        Stack {
            engine,
            monitor,
            drivers,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_observes_running_engine() {
        let s = stack();
        let token = CancellationToken::new();
        assert!(s.engine.initialize(&token).await.success);
        assert!(s.engine.start(&token).await.success);
        assert!(s.monitor.is_running());

        // Past the second health tick at 30s
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert!(s.monitor.latest_metrics().is_some());
        let health = s.monitor.latest_health().unwrap();
        assert_eq!(health.engine_state, LifecycleState::Running);
        assert_eq!(health.total(), 3);
        assert!(health.is_healthy);

        let dashboard = s.monitor.dashboard_data().await;
        assert_eq!(dashboard.engine_id, s.engine.id());
        assert_eq!(dashboard.version, s.engine.version());
        assert_eq!(dashboard.state, LifecycleState::Running);
        assert_eq!(dashboard.modules.len(), 3);
        assert!(dashboard
            .recent_events
            .iter()
            .any(|e| e.category == category::LIFECYCLE && e.title == "Lifecycle start"));

        s.engine.shutdown(&token).await;
        assert!(!s.monitor.is_running());
        assert_eq!(
            s.engine
                .module(&ModuleId::from(MONITOR_MODULE_ID))
                .unwrap()
                .state,
            LifecycleState::Shutdown
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_fault_surfaces_in_monitor_and_health() {
        let s = stack();
        let token = CancellationToken::new();
        s.engine.initialize(&token).await;
        s.engine.start(&token).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let clock = s.drivers.get_by_type::<ClockDriver>().pop().unwrap();
        clock.set_state(DriverState::Error);
        tokio::time::sleep(Duration::from_secs(1)).await;

        let faults: Vec<_> = s
            .monitor
            .all_events()
            .into_iter()
            .filter(|e| e.event_type == "DriverStateChanged" && e.severity == EventSeverity::Error)
            .collect();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].category, category::DRIVER);

        let health = s.engine.health(&token).await;
        let drivers = health
            .modules
            .iter()
            .find(|m| m.module_id == ModuleId::from("drivers"))
            .unwrap();
        assert!(!drivers.health.is_healthy());

        s.engine.shutdown(&token).await;
        assert!(s.drivers.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_outlives_dropped_engine() {
        let s = stack();
        let token = CancellationToken::new();
        s.engine.initialize(&token).await;
        let monitor = s.monitor.clone();
        drop(s);

        let dashboard = monitor.dashboard_data().await;
        assert_eq!(dashboard.engine_id, "unknown");
        assert!(monitor.check_health(token).await.is_err());
    }
}
