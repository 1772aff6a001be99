//! Value objects for priority resolution

use serde::{Deserialize, Serialize};
use shared_types::entities::ModuleId;
use shared_types::priority::PriorityConfig;
use std::fmt;
use std::str::FromStr;

use super::errors::ResolverError;

/// Whether a context adjustment may move a module out of its level's range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelBoundaryPolicy {
    /// Keep the effective priority inside `[base, base + 99]`.
    /// Level ordering is never inverted by a context.
    #[default]
    Clamp,
    /// Apply the raw sum. An adjusted module may rank inside a
    /// neighbouring level's range.
    Allow,
}

impl LevelBoundaryPolicy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clamp => "clamp",
            Self::Allow => "allow",
        }
    }
}

impl fmt::Display for LevelBoundaryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LevelBoundaryPolicy {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "allow" => Ok(Self::Allow),
            other => Err(ResolverError::UnknownBoundaryPolicy(other.to_string())),
        }
    }
}

/// One module as seen by the planner.
#[derive(Debug, Clone)]
pub struct PlanCandidate {
    pub module_id: ModuleId,
    pub priority: PriorityConfig,
    /// Position in registration order; the tie-break for equal priorities.
    pub registration_index: usize,
}

impl PlanCandidate {
    pub fn new(
        module_id: impl Into<ModuleId>,
        priority: PriorityConfig,
        registration_index: usize,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            priority,
            registration_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "Clamp".parse::<LevelBoundaryPolicy>().unwrap(),
            LevelBoundaryPolicy::Clamp
        );
        assert_eq!(
            " allow ".parse::<LevelBoundaryPolicy>().unwrap(),
            LevelBoundaryPolicy::Allow
        );
        assert!(matches!(
            "wrap".parse::<LevelBoundaryPolicy>(),
            Err(ResolverError::UnknownBoundaryPolicy(p)) if p == "wrap"
        ));
    }

    #[test]
    fn test_policy_serde() {
        let json = serde_json::to_string(&LevelBoundaryPolicy::Allow).unwrap();
        assert_eq!(json, "\"allow\"");
        assert_eq!(LevelBoundaryPolicy::default(), LevelBoundaryPolicy::Clamp);
    }
}
