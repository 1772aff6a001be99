//! Core entities for phase planning

use serde::{Deserialize, Serialize};
use shared_types::entities::ModuleId;
use std::fmt;

/// A scheduling slot of one or more modules.
///
/// Modules of a multi-member phase share one effective priority and all
/// allow parallel initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Position in the plan
    pub index: usize,
    /// Effective priority shared by every member
    pub effective_priority: i32,
    /// Members in registration order
    pub modules: Vec<ModuleId>,
}

impl Phase {
    pub fn new(index: usize, effective_priority: i32, modules: Vec<ModuleId>) -> Self {
        Self {
            index,
            effective_priority,
            modules,
        }
    }

    #[must_use]
    pub fn modules(&self) -> &[ModuleId] {
        &self.modules
    }

    #[must_use]
    pub fn effective_priority(&self) -> i32 {
        self.effective_priority
    }

    /// Whether members run concurrently.
    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.modules.len() > 1
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.contains(id)
    }
}

/// Ordered list of phases covering every candidate exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasePlan {
    /// Context the plan was resolved under
    pub context: String,
    pub phases: Vec<Phase>,
}

impl PhasePlan {
    pub fn new(context: impl Into<String>, phases: Vec<Phase>) -> Self {
        Self {
            context: context.into(),
            phases,
        }
    }

    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Number of phases
    #[must_use]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Total modules across all phases
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.phases.iter().map(Phase::len).sum()
    }

    /// Largest phase size
    #[must_use]
    pub fn max_parallelism(&self) -> usize {
        self.phases.iter().map(Phase::len).max().unwrap_or(0)
    }

    /// Modules in execution order
    #[must_use]
    pub fn flatten(&self) -> Vec<ModuleId> {
        self.phases
            .iter()
            .flat_map(|p| p.modules.iter().cloned())
            .collect()
    }

    /// Teardown order: phases reversed, membership unchanged.
    ///
    /// Phase indices are renumbered so that `index` stays the execution
    /// position.
    #[must_use]
    pub fn reversed(&self) -> PhasePlan {
        let phases = self
            .phases
            .iter()
            .rev()
            .enumerate()
            .map(|(index, p)| Phase::new(index, p.effective_priority, p.modules.clone()))
            .collect();
        PhasePlan::new(self.context.clone(), phases)
    }

    /// Index of the phase containing `id`.
    #[must_use]
    pub fn phase_of(&self, id: &ModuleId) -> Option<usize> {
        self.phases.iter().position(|p| p.contains(id))
    }
}

impl fmt::Display for PhasePlan {
    /// `[a] -> [b, c]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.phases.is_empty() {
            return f.write_str("[]");
        }
        for (i, phase) in self.phases.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            let names: Vec<&str> = phase.modules.iter().map(ModuleId::as_str).collect();
            write!(f, "[{}]", names.join(", "))?;
        }
        Ok(())
    }
}
