//! # Module Registry
//!
//! The engine's module table: every registered module with its declared
//! priority, registration index and current lifecycle state.
//!
//! Registration happens once, before Initialize. Afterwards the table is
//! read-mostly: only per-module state changes are written, each under a
//! short write lock that is never held across an await.

use std::collections::HashMap;
use std::sync::Arc;

use mk_01_priority_resolver::{PlanCandidate, PriorityResolver, PriorityResolverApi};
use parking_lot::RwLock;
use shared_types::entities::{LifecycleState, ModuleDescriptor, ModuleId};
use shared_types::priority::PriorityConfig;
use shared_types::Module;
use tracing::info;

use crate::domain::LifecycleError;

struct ModuleEntry {
    module: Arc<dyn Module>,
    name: String,
    version: String,
    priority: PriorityConfig,
    registration_index: usize,
    state: LifecycleState,
}

#[derive(Default)]
struct Table {
    entries: Vec<ModuleEntry>,
    index: HashMap<ModuleId, usize>,
}

/// A registered module handed to the coordinator.
#[derive(Clone)]
pub struct ModuleHandle {
    pub id: ModuleId,
    pub name: String,
    pub module: Arc<dyn Module>,
    pub state: LifecycleState,
}

/// The central module table.
#[derive(Default)]
pub struct ModuleRegistry {
    table: RwLock<Table>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module. Priority, name and version are read once here.
    pub fn register(&self, module: Arc<dyn Module>) -> Result<usize, LifecycleError> {
        let id = module.id();
        let mut table = self.table.write();
        if table.index.contains_key(&id) {
            return Err(LifecycleError::DuplicateModule(id));
        }

        let registration_index = table.entries.len();
        let entry = ModuleEntry {
            name: module.name().to_string(),
            version: module.version().to_string(),
            priority: module.priority(),
            registration_index,
            state: LifecycleState::Created,
            module,
        };
        info!(
            module_id = %id,
            level = %entry.priority.level().name(),
            sub_priority = entry.priority.sub_priority(),
            "[Registry] Registering module: {}",
            entry.name
        );

        table.entries.push(entry);
        table.index.insert(id, registration_index);
        Ok(table.entries.len())
    }

    pub fn len(&self) -> usize {
        self.table.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().entries.is_empty()
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.table.read().index.contains_key(id)
    }

    pub fn get(&self, id: &ModuleId) -> Option<ModuleHandle> {
        let table = self.table.read();
        table.index.get(id).map(|&i| handle(&table.entries[i]))
    }

    /// Every module in registration order.
    pub fn handles(&self) -> Vec<ModuleHandle> {
        self.table.read().entries.iter().map(handle).collect()
    }

    pub fn state(&self, id: &ModuleId) -> Option<LifecycleState> {
        let table = self.table.read();
        table.index.get(id).map(|&i| table.entries[i].state)
    }

    /// Set a module's state. Returns the previous state.
    pub fn set_state(&self, id: &ModuleId, state: LifecycleState) -> Option<LifecycleState> {
        let mut table = self.table.write();
        let i = *table.index.get(id)?;
        let entry = &mut table.entries[i];
        Some(std::mem::replace(&mut entry.state, state))
    }

    /// Modules currently in `state`.
    pub fn ids_in_state(&self, state: LifecycleState) -> Vec<ModuleId> {
        self.table
            .read()
            .entries
            .iter()
            .filter(|e| e.state == state)
            .map(|e| e.module_id())
            .collect()
    }

    /// Planner input in registration order.
    pub fn candidates(&self) -> Vec<PlanCandidate> {
        self.table
            .read()
            .entries
            .iter()
            .map(|e| PlanCandidate::new(e.module_id(), e.priority.clone(), e.registration_index))
            .collect()
    }

    /// Descriptors in registration order, with effective priorities under
    /// `context`.
    pub fn descriptors(&self, resolver: &PriorityResolver, context: &str) -> Vec<ModuleDescriptor> {
        self.table
            .read()
            .entries
            .iter()
            .map(|e| ModuleDescriptor {
                id: e.module_id(),
                name: e.name.clone(),
                version: e.version.clone(),
                state: e.state,
                effective_priority: resolver.effective_priority(&e.priority, context),
                priority: e.priority.clone(),
                registration_index: e.registration_index,
            })
            .collect()
    }

    pub fn descriptor(
        &self,
        id: &ModuleId,
        resolver: &PriorityResolver,
        context: &str,
    ) -> Option<ModuleDescriptor> {
        self.descriptors(resolver, context)
            .into_iter()
            .find(|d| &d.id == id)
    }

    /// Count of modules per state.
    pub fn state_counts(&self) -> HashMap<LifecycleState, usize> {
        let mut counts = HashMap::new();
        for entry in self.table.read().entries.iter() {
            *counts.entry(entry.state).or_insert(0) += 1;
        }
        counts
    }
}

impl ModuleEntry {
    fn module_id(&self) -> ModuleId {
        self.module.id()
    }
}

fn handle(entry: &ModuleEntry) -> ModuleHandle {
    ModuleHandle {
        id: entry.module_id(),
        name: entry.name.clone(),
        module: entry.module.clone(),
        state: entry.state,
    }
}
