//! # Priority Configuration
//!
//! Priority levels are an ordered enum where every variant carries its own
//! base offset. Each level reserves [`PriorityLevel::SLOTS`] integer slots:
//!
//! | Level | Range |
//! |-------|-------|
//! | Critical | 0..=99 |
//! | Infrastructure | 100..=199 |
//! | Core | 200..=299 |
//! | Service | 300..=399 |
//! | Feature | 400..=499 |
//! | Monitoring | 500..=599 |
//!
//! Lower values run earlier.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::RangeInclusive;

use crate::errors::PriorityConfigError;

/// Coarse scheduling band.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PriorityLevel {
    Critical,
    Infrastructure,
    Core,
    Service,
    Feature,
    Monitoring,
}

impl PriorityLevel {
    /// Integer slots reserved per level.
    pub const SLOTS: i32 = 100;

    /// Maximum sub-priority within a level.
    pub const MAX_SUB_PRIORITY: u8 = 99;

    /// Base offset of this level's range.
    #[must_use]
    pub const fn base(self) -> i32 {
        match self {
            Self::Critical => 0,
            Self::Infrastructure => 100,
            Self::Core => 200,
            Self::Service => 300,
            Self::Feature => 400,
            Self::Monitoring => 500,
        }
    }

    /// Inclusive range of effective priorities owned by this level.
    #[must_use]
    pub const fn range(self) -> RangeInclusive<i32> {
        RangeInclusive::new(self.base(), self.base() + Self::SLOTS - 1)
    }

    /// The level whose range contains `priority`, if any.
    #[must_use]
    pub fn containing(priority: i32) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|level| level.range().contains(&priority))
    }

    /// Get the level name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::Infrastructure => "Infrastructure",
            Self::Core => "Core",
            Self::Service => "Service",
            Self::Feature => "Feature",
            Self::Monitoring => "Monitoring",
        }
    }

    /// All levels in execution order.
    #[must_use]
    pub fn all() -> [PriorityLevel; 6] {
        [
            Self::Critical,
            Self::Infrastructure,
            Self::Core,
            Self::Service,
            Self::Feature,
            Self::Monitoring,
        ]
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable scheduling configuration of a module.
///
/// Built through [`PriorityConfigBuilder`]; context names are matched
/// case-insensitively. Deserialized values go through the same validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPriorityConfig")]
pub struct PriorityConfig {
    level: PriorityLevel,
    sub_priority: u8,
    can_parallel_initialize: bool,
    context_adjustments: BTreeMap<String, i32>,
    tags: BTreeSet<String>,
    weight: Option<f64>,
}

impl PriorityConfig {
    /// Start building a configuration for `level`.
    #[must_use]
    pub fn builder(level: PriorityLevel) -> PriorityConfigBuilder {
        PriorityConfigBuilder::new(level)
    }

    /// Configuration with sub-priority 0, no adjustments and no parallelism.
    #[must_use]
    pub fn at_level(level: PriorityLevel) -> Self {
        Self {
            level,
            sub_priority: 0,
            can_parallel_initialize: false,
            context_adjustments: BTreeMap::new(),
            tags: BTreeSet::new(),
            weight: None,
        }
    }

    #[must_use]
    pub fn level(&self) -> PriorityLevel {
        self.level
    }

    #[must_use]
    pub fn sub_priority(&self) -> u8 {
        self.sub_priority
    }

    #[must_use]
    pub fn can_parallel_initialize(&self) -> bool {
        self.can_parallel_initialize
    }

    /// Adjustment declared for `context`, 0 when none.
    #[must_use]
    pub fn adjustment_for(&self, context: &str) -> i32 {
        self.context_adjustments
            .get(&context.to_lowercase())
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn context_adjustments(&self) -> &BTreeMap<String, i32> {
        &self.context_adjustments
    }

    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    #[must_use]
    pub fn weight(&self) -> Option<f64> {
        self.weight
    }

    /// `base(level) + sub_priority`, before any context adjustment.
    #[must_use]
    pub fn base_priority(&self) -> i32 {
        self.level.base() + i32::from(self.sub_priority)
    }
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self::at_level(PriorityLevel::Service)
    }
}

/// Builder for [`PriorityConfig`].
#[derive(Debug, Clone)]
pub struct PriorityConfigBuilder {
    inner: PriorityConfig,
    sub_priority: u32,
}

impl PriorityConfigBuilder {
    fn new(level: PriorityLevel) -> Self {
        Self {
            inner: PriorityConfig::at_level(level),
            sub_priority: 0,
        }
    }

    /// Position within the level's range (0..=99).
    #[must_use]
    pub fn sub_priority(mut self, sub_priority: u32) -> Self {
        self.sub_priority = sub_priority;
        self
    }

    /// Allow this module to share a phase with equal-priority peers.
    #[must_use]
    pub fn parallel(mut self, can_parallel_initialize: bool) -> Self {
        self.inner.can_parallel_initialize = can_parallel_initialize;
        self
    }

    /// Shift the effective priority when running under `context`.
    #[must_use]
    pub fn adjust(mut self, context: &str, adjustment: i32) -> Self {
        self.inner
            .context_adjustments
            .insert(context.to_lowercase(), adjustment);
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.inner.tags.insert(tag.into());
        self
    }

    #[must_use]
    pub fn weight(mut self, weight: f64) -> Self {
        self.inner.weight = Some(weight);
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<PriorityConfig, PriorityConfigError> {
        if self.sub_priority > u32::from(PriorityLevel::MAX_SUB_PRIORITY) {
            return Err(PriorityConfigError::SubPriorityOutOfRange {
                value: self.sub_priority,
                max: PriorityLevel::MAX_SUB_PRIORITY,
            });
        }
        if let Some(weight) = self.inner.weight {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PriorityConfigError::InvalidWeight(weight));
            }
        }

        let mut config = self.inner;
        config.sub_priority = self.sub_priority as u8;
        Ok(config)
    }
}

/// Unvalidated wire form of [`PriorityConfig`].
#[derive(Deserialize)]
struct RawPriorityConfig {
    level: PriorityLevel,
    #[serde(default)]
    sub_priority: u32,
    #[serde(default)]
    can_parallel_initialize: bool,
    #[serde(default)]
    context_adjustments: BTreeMap<String, i32>,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    weight: Option<f64>,
}

impl TryFrom<RawPriorityConfig> for PriorityConfig {
    type Error = PriorityConfigError;

    fn try_from(raw: RawPriorityConfig) -> Result<Self, Self::Error> {
        let mut builder = PriorityConfig::builder(raw.level)
            .sub_priority(raw.sub_priority)
            .parallel(raw.can_parallel_initialize);
        for (context, adjustment) in &raw.context_adjustments {
            builder = builder.adjust(context, *adjustment);
        }
        for tag in raw.tags {
            builder = builder.tag(tag);
        }
        if let Some(weight) = raw.weight {
            builder = builder.weight(weight);
        }
        builder.build()
    }
}
