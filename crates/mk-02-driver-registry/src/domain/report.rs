//! Health validation report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::entities::DriverId;
use std::collections::BTreeMap;

/// Outcome of [`DriverRegistry::validate_health`](crate::DriverRegistry::validate_health).
///
/// `errored` holds drivers whose probe failed, panicked or timed out; they
/// are never counted as `unhealthy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthValidationReport {
    pub healthy: Vec<DriverId>,
    pub unhealthy: Vec<DriverId>,
    pub errored: Vec<DriverId>,
    /// Probe message (healthy/unhealthy) or error text (errored) per driver
    pub details: BTreeMap<DriverId, String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthValidationReport {
    pub fn new() -> Self {
        Self {
            healthy: Vec::new(),
            unhealthy: Vec::new(),
            errored: Vec::new(),
            details: BTreeMap::new(),
            checked_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.healthy.len() + self.unhealthy.len() + self.errored.len()
    }

    /// `healthy / total * 100`, `0` with no drivers.
    #[must_use]
    pub fn health_percentage(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.healthy.len() as f64 / total as f64 * 100.0
    }

    #[must_use]
    pub fn all_healthy(&self) -> bool {
        self.total() > 0 && self.healthy.len() == self.total()
    }
}

impl Default for HealthValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let report = HealthValidationReport::new();
        assert_eq!(report.total(), 0);
        assert_eq!(report.health_percentage(), 0.0);
        assert!(!report.all_healthy());
    }

    #[test]
    fn test_percentage() {
        let mut report = HealthValidationReport::new();
        report.healthy.push(DriverId::from("a"));
        report.unhealthy.push(DriverId::from("b"));
        report.errored.push(DriverId::from("c"));
        report.healthy.push(DriverId::from("d"));

        assert_eq!(report.total(), 4);
        assert_eq!(report.health_percentage(), 50.0);
    }
}
