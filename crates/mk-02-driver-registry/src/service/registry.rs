//! # Driver Registry
//!
//! Primary `id -> driver` table plus a secondary `TypeId -> [id]` index,
//! both behind one `parking_lot::RwLock`: mutations take the write lock
//! once and update both tables together, lookups share the read lock.
//!
//! While a driver is registered a watcher task follows its state channel,
//! logs transitions and republishes them on the event bus. The task is
//! aborted on unregister, on [`DriverRegistry::shutdown`] and on drop.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use parking_lot::RwLock;
use shared_bus::{InMemoryEventBus, KernelEvent};
use shared_types::entities::{DriverId, DriverState};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::domain::driver::{Driver, DriverHealth};
use crate::domain::errors::{DriverError, RegistryError};
use crate::domain::report::HealthValidationReport;

struct DriverEntry {
    driver: Arc<dyn Driver>,
    /// Same allocation as `driver`, kept for typed downcasts.
    any: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    watcher: Option<JoinHandle<()>>,
}

impl DriverEntry {
    fn stop_watching(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

#[derive(Default)]
struct Tables {
    by_id: BTreeMap<DriverId, DriverEntry>,
    by_type: HashMap<TypeId, Vec<DriverId>>,
    closed: bool,
}

/// Registry of driver components.
pub struct DriverRegistry {
    tables: RwLock<Tables>,
    config: RegistryConfig,
    event_bus: Option<Arc<InMemoryEventBus>>,
}

enum ProbeOutcome {
    Healthy(String),
    Unhealthy(String),
    Errored(String),
}

impl DriverRegistry {
    /// Create a registry with default config and no event bus.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            config,
            event_bus: None,
        }
    }

    /// Publish registry events on `event_bus`.
    #[must_use]
    pub fn with_event_bus(mut self, event_bus: Arc<InMemoryEventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Register a driver.
    ///
    /// Fails without touching the tables if the id is taken or the registry
    /// has been shut down.
    pub fn register<D: Driver>(&self, driver: Arc<D>) -> Result<(), RegistryError> {
        let id = driver.id();
        let name = driver.name().to_string();
        let driver_type = driver.driver_type().to_string();

        let count = {
            let mut tables = self.tables.write();
            if tables.closed {
                return Err(RegistryError::RegistryClosed);
            }
            if tables.by_id.contains_key(&id) {
                warn!("[Registry] Rejected duplicate driver: {}", id);
                return Err(RegistryError::DuplicateDriver(id));
            }

            let type_id = TypeId::of::<D>();
            let any: Arc<dyn Any + Send + Sync> = driver.clone();
            let dyn_driver: Arc<dyn Driver> = driver;
            let watcher = self.spawn_watcher(&dyn_driver);

            tables.by_id.insert(
                id.clone(),
                DriverEntry {
                    driver: dyn_driver,
                    any,
                    type_id,
                    watcher,
                },
            );
            tables.by_type.entry(type_id).or_default().push(id.clone());
            tables.by_id.len()
        };

        kernel_telemetry::REGISTERED_DRIVERS.set(count as f64);
        info!(
            driver_id = %id,
            driver_type = %driver_type,
            "[Registry] Registered driver: {}",
            name
        );
        self.publish(KernelEvent::DriverRegistered {
            driver_id: id,
            name,
            driver_type,
        });

        Ok(())
    }

    /// Remove a driver from both tables and stop watching it.
    pub fn unregister(&self, id: &DriverId) -> Result<Arc<dyn Driver>, RegistryError> {
        let (entry, count) = {
            let mut tables = self.tables.write();
            let mut entry = tables
                .by_id
                .remove(id)
                .ok_or_else(|| RegistryError::UnknownDriver(id.clone()))?;

            if let Some(ids) = tables.by_type.get_mut(&entry.type_id) {
                ids.retain(|other| other != id);
                if ids.is_empty() {
                    tables.by_type.remove(&entry.type_id);
                }
            }
            entry.stop_watching();
            (entry, tables.by_id.len())
        };

        kernel_telemetry::REGISTERED_DRIVERS.set(count as f64);
        let name = entry.driver.name().to_string();
        info!(driver_id = %id, "[Registry] Unregistered driver: {}", name);
        self.publish(KernelEvent::DriverUnregistered {
            driver_id: id.clone(),
            name,
        });

        Ok(entry.driver)
    }

    pub fn get(&self, id: &DriverId) -> Option<Arc<dyn Driver>> {
        self.tables.read().by_id.get(id).map(|e| e.driver.clone())
    }

    /// All registered drivers of concrete type `D`, in registration order.
    pub fn get_by_type<D: Driver>(&self) -> Vec<Arc<D>> {
        let tables = self.tables.read();
        let Some(ids) = tables.by_type.get(&TypeId::of::<D>()) else {
            return Vec::new();
        };

        ids.iter()
            .filter_map(|id| tables.by_id.get(id))
            .filter_map(|entry| entry.any.clone().downcast::<D>().ok())
            .collect()
    }

    pub fn get_all_by_state(&self, state: DriverState) -> Vec<Arc<dyn Driver>> {
        self.tables
            .read()
            .by_id
            .values()
            .filter(|e| e.driver.state() == state)
            .map(|e| e.driver.clone())
            .collect()
    }

    /// Drivers whose name contains `pattern`, ignoring case.
    pub fn find_by_name_pattern(&self, pattern: &str) -> Vec<Arc<dyn Driver>> {
        let needle = pattern.to_lowercase();
        self.tables
            .read()
            .by_id
            .values()
            .filter(|e| e.driver.name().to_lowercase().contains(&needle))
            .map(|e| e.driver.clone())
            .collect()
    }

    /// Snapshot of every registered driver, ordered by id.
    pub fn all(&self) -> Vec<Arc<dyn Driver>> {
        self.tables
            .read()
            .by_id
            .values()
            .map(|e| e.driver.clone())
            .collect()
    }

    pub fn contains(&self, id: &DriverId) -> bool {
        self.tables.read().by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tables.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().by_id.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.tables.read().closed
    }

    /// Probe every driver concurrently.
    ///
    /// A probe that fails, panics or exceeds the configured timeout lands in
    /// `errored`; it never prevents the others from being reported.
    pub async fn validate_health(&self) -> HealthValidationReport {
        let drivers = self.all();
        let deadline = self.config.health_check_timeout();

        let probes = drivers.into_iter().map(|driver| async move {
            let probe = AssertUnwindSafe(driver.check_health()).catch_unwind();
            let outcome = match tokio::time::timeout(deadline, probe).await {
                Ok(Ok(Ok(DriverHealth { healthy: true, message }))) => {
                    ProbeOutcome::Healthy(message)
                }
                Ok(Ok(Ok(DriverHealth { message, .. }))) => ProbeOutcome::Unhealthy(message),
                Ok(Ok(Err(e))) => ProbeOutcome::Errored(e.to_string()),
                Ok(Err(_)) => ProbeOutcome::Errored(
                    DriverError::HealthCheckFailed("probe panicked".to_string()).to_string(),
                ),
                Err(_) => ProbeOutcome::Errored(
                    DriverError::HealthCheckFailed(format!(
                        "probe timed out after {}ms",
                        deadline.as_millis()
                    ))
                    .to_string(),
                ),
            };
            (driver.id(), outcome)
        });

        let mut report = HealthValidationReport::new();
        for (id, outcome) in join_all(probes).await {
            match outcome {
                ProbeOutcome::Healthy(message) => {
                    report.details.insert(id.clone(), message);
                    report.healthy.push(id);
                }
                ProbeOutcome::Unhealthy(message) => {
                    report.details.insert(id.clone(), message);
                    report.unhealthy.push(id);
                }
                ProbeOutcome::Errored(message) => {
                    warn!(driver_id = %id, error = %message, "[Registry] Driver health probe failed");
                    report.details.insert(id.clone(), message);
                    report.errored.push(id);
                }
            }
        }

        let percentage = report.health_percentage();
        kernel_telemetry::DRIVER_HEALTH_PERCENTAGE.set(percentage);
        info!(
            healthy = report.healthy.len(),
            unhealthy = report.unhealthy.len(),
            errored = report.errored.len(),
            percentage = percentage,
            "[Registry] Driver health validated"
        );

        report
    }

    /// Dispose the registry: stop every watcher, drop every driver and
    /// refuse further registrations. Idempotent.
    pub fn shutdown(&self) -> usize {
        let removed = {
            let mut tables = self.tables.write();
            if tables.closed {
                return 0;
            }
            tables.closed = true;
            for entry in tables.by_id.values_mut() {
                entry.stop_watching();
            }
            let removed = tables.by_id.len();
            tables.by_id.clear();
            tables.by_type.clear();
            removed
        };

        kernel_telemetry::REGISTERED_DRIVERS.set(0.0);
        info!(drivers = removed, "[Registry] Shut down");
        removed
    }

    fn publish(&self, event: KernelEvent) {
        if let Some(bus) = &self.event_bus {
            bus.send(event);
        }
    }

    /// Follow the driver's state channel on the current runtime. Without a
    /// runtime, registration still succeeds but transitions are not logged.
    fn spawn_watcher(&self, driver: &Arc<dyn Driver>) -> Option<JoinHandle<()>> {
        let Ok(runtime) = Handle::try_current() else {
            debug!(
                driver_id = %driver.id(),
                "[Registry] No async runtime, state changes will not be watched"
            );
            return None;
        };

        let mut rx = driver.subscribe_state();
        // Baseline is taken here so changes made right after registration
        // are seen even if the task has not been polled yet.
        let mut previous = *rx.borrow_and_update();
        let id = driver.id();
        let name = driver.name().to_string();
        let bus = self.event_bus.clone();

        Some(runtime.spawn(async move {
            while rx.changed().await.is_ok() {
                let current = *rx.borrow_and_update();
                if current == previous {
                    continue;
                }

                log_transition(&id, &name, previous, current);
                if let Some(bus) = &bus {
                    bus.send(KernelEvent::DriverStateChanged {
                        driver_id: id.clone(),
                        name: name.clone(),
                        from: previous,
                        to: current,
                    });
                }
                previous = current;
            }
        }))
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DriverRegistry {
    fn drop(&mut self) {
        for entry in self.tables.get_mut().by_id.values_mut() {
            entry.stop_watching();
        }
    }
}

fn log_transition(id: &DriverId, name: &str, from: DriverState, to: DriverState) {
    match to {
        DriverState::Error => kernel_telemetry::log_driver_event!(
            error,
            "registry",
            "[Registry] Driver entered Error state",
            id,
            name = name,
            from = %from
        ),
        DriverState::Running => kernel_telemetry::log_driver_event!(
            info,
            "registry",
            "[Registry] Driver is running",
            id,
            name = name,
            from = %from
        ),
        _ => kernel_telemetry::log_driver_event!(
            debug,
            "registry",
            "[Registry] Driver changed state",
            id,
            name = name,
            from = %from,
            to = %to
        ),
    }
}
