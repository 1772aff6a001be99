//! Configuration for the Priority Resolver

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::LevelBoundaryPolicy;

/// Resolver configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Whether context adjustments may cross level boundaries
    pub boundary_policy: LevelBoundaryPolicy,
}

impl ResolverConfig {
    pub fn with_policy(boundary_policy: LevelBoundaryPolicy) -> Self {
        Self { boundary_policy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.boundary_policy, LevelBoundaryPolicy::Clamp);
    }
}
