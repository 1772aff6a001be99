//! Algorithms for priority resolution
//!
//! - Effective priority: level base + sub-priority + context adjustment
//! - Phase planner: sorted walk producing barrier and parallel phases

pub mod effective_priority;
pub mod phase_planner;

pub use effective_priority::{effective_level, effective_priority};
pub use phase_planner::plan_phases;
