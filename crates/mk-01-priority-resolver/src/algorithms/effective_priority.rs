//! Effective priority computation
//!
//! `base(level) + sub_priority + adjustment(context)`; lower runs earlier.

use crate::domain::value_objects::LevelBoundaryPolicy;
use shared_types::priority::{PriorityConfig, PriorityLevel};

/// Compute the effective priority of `config` under `context`.
///
/// Context names match case-insensitively. With
/// [`LevelBoundaryPolicy::Clamp`] the result stays inside the level's
/// range; with [`LevelBoundaryPolicy::Allow`] it is the raw sum.
pub fn effective_priority(
    config: &PriorityConfig,
    context: &str,
    policy: LevelBoundaryPolicy,
) -> i32 {
    let raw = config
        .base_priority()
        .saturating_add(config.adjustment_for(context));

    match policy {
        LevelBoundaryPolicy::Allow => raw,
        LevelBoundaryPolicy::Clamp => {
            let range = config.level().range();
            raw.clamp(*range.start(), *range.end())
        }
    }
}

/// Level whose range holds the effective priority. `None` when an
/// `Allow` adjustment pushed it outside every range.
pub fn effective_level(
    config: &PriorityConfig,
    context: &str,
    policy: LevelBoundaryPolicy,
) -> Option<PriorityLevel> {
    PriorityLevel::containing(effective_priority(config, context, policy))
}
