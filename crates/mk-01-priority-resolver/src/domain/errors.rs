//! Error types for priority resolution
//!
//! Planning itself never fails; these cover configuration input.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolverError {
    /// Boundary policy name not recognised
    #[error("Unknown level boundary policy: {0} (expected clamp or allow)")]
    UnknownBoundaryPolicy(String),
}
