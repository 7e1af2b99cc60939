//! Style profiles: named target-range configurations.
//!
//! A profile declares, per metric, the range a mix should land in for a
//! given musical character. Built-in profiles ship with the binary; user
//! profiles live in a writable directory and shadow built-ins by name
//! without deleting them (see [`store::ProfileStore`]).

pub mod builtin;
pub mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MixmeterError, Result};
use crate::features::{Band, MetricId};

pub use store::ProfileStore;

/// Inclusive target range for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub low: f64,
    pub high: f64,
}

impl Range {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// True iff `low <= value <= high`, inclusive at both bounds.
    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }

    /// Signed distance outside the range: 0 inside, negative below `low`,
    /// positive above `high`.
    pub fn signed_distance(&self, value: f64) -> f64 {
        if value < self.low {
            value - self.low
        } else if value > self.high {
            value - self.high
        } else {
            0.0
        }
    }

    /// A range is well-formed iff both bounds are finite and `low <= high`.
    pub fn is_well_formed(&self) -> bool {
        self.low.is_finite() && self.high.is_finite() && self.low <= self.high
    }
}

/// Where a profile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Shipped with the binary; immutable.
    Builtin,
    /// Created at runtime; persisted to the user styles directory.
    User,
}

impl Default for Origin {
    fn default() -> Self {
        Origin::User
    }
}

/// The per-metric target ranges of a profile.
///
/// Kept separate from the profile identity so partial updates and
/// override merging operate on one value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeSet {
    /// Target energy fraction per band.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub frequency_balance: BTreeMap<String, Range>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_range_db: Option<Range>,

    /// Spectral centroid target in Hz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<Range>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stereo_width: Option<Range>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rms_mean: Option<Range>,

    /// Optional per-metric weights for the cohesion aggregate.
    /// Metrics not named here weigh 1.0.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub weights: BTreeMap<String, f64>,
}

impl RangeSet {
    /// True when no metric is declared at all.
    pub fn is_empty(&self) -> bool {
        self.frequency_balance.is_empty()
            && self.dynamic_range_db.is_none()
            && self.brightness.is_none()
            && self.stereo_width.is_none()
            && self.rms_mean.is_none()
    }

    /// Range declared for a metric, if any.
    pub fn range_for(&self, id: MetricId) -> Option<Range> {
        match id {
            MetricId::Band(b) => self.frequency_balance.get(b.as_str()).copied(),
            MetricId::DynamicRangeDb => self.dynamic_range_db,
            MetricId::Brightness => self.brightness,
            MetricId::StereoWidth => self.stereo_width,
            MetricId::RmsMean => self.rms_mean,
        }
    }

    /// Overlay `self` on top of `base`: ranges present here win per metric,
    /// everything else falls back to `base`.
    pub fn merged_over(&self, base: &RangeSet) -> RangeSet {
        let mut frequency_balance = base.frequency_balance.clone();
        for (band, range) in &self.frequency_balance {
            frequency_balance.insert(band.clone(), *range);
        }
        let mut weights = base.weights.clone();
        for (metric, weight) in &self.weights {
            weights.insert(metric.clone(), *weight);
        }
        RangeSet {
            frequency_balance,
            dynamic_range_db: self.dynamic_range_db.or(base.dynamic_range_db),
            brightness: self.brightness.or(base.brightness),
            stereo_width: self.stereo_width.or(base.stereo_width),
            rms_mean: self.rms_mean.or(base.rms_mean),
            weights,
        }
    }
}

/// A named style profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleProfile {
    /// Unique key across both layers of the store.
    pub name: String,

    pub description: String,

    #[serde(flatten)]
    pub ranges: RangeSet,

    /// Set by the store; never persisted.
    #[serde(skip)]
    pub origin: Origin,
}

impl StyleProfile {
    pub fn new(name: impl Into<String>, description: impl Into<String>, ranges: RangeSet) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ranges,
            origin: Origin::User,
        }
    }

    /// Range declared for a metric, if any.
    pub fn range_for(&self, id: MetricId) -> Option<Range> {
        self.ranges.range_for(id)
    }

    /// Every metric this profile declares, in stable declaration order.
    pub fn declared_metrics(&self) -> Vec<MetricId> {
        MetricId::ALL
            .iter()
            .copied()
            .filter(|id| self.range_for(*id).is_some())
            .collect()
    }

    /// Aggregate weight for a metric; 1.0 unless the profile says otherwise.
    pub fn weight_for(&self, id: MetricId) -> f64 {
        self.ranges.weights.get(id.as_str()).copied().unwrap_or(1.0)
    }

    /// Reject malformed ranges, unknown band names, and bad weights.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| MixmeterError::InvalidProfile {
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }

        for (band, range) in &self.ranges.frequency_balance {
            if Band::from_name(band).is_none() {
                return Err(invalid(format!("unknown band '{}'", band)));
            }
            if !range.is_well_formed() {
                return Err(invalid(format!(
                    "band '{}' range [{}, {}] is malformed",
                    band, range.low, range.high
                )));
            }
        }

        let scalars = [
            ("dynamic_range_db", self.ranges.dynamic_range_db),
            ("brightness", self.ranges.brightness),
            ("stereo_width", self.ranges.stereo_width),
            ("rms_mean", self.ranges.rms_mean),
        ];
        for (name, range) in scalars {
            if let Some(range) = range {
                if !range.is_well_formed() {
                    return Err(invalid(format!(
                        "{} range [{}, {}] is malformed",
                        name, range.low, range.high
                    )));
                }
            }
        }

        for (metric, weight) in &self.ranges.weights {
            if MetricId::from_name(metric).is_none() {
                return Err(invalid(format!("weight for unknown metric '{}'", metric)));
            }
            if !weight.is_finite() || *weight <= 0.0 {
                return Err(invalid(format!(
                    "weight for '{}' must be a positive finite number",
                    metric
                )));
            }
        }

        Ok(())
    }

    /// Merge a user override over a built-in of the same name.
    ///
    /// Override ranges win per metric; unspecified metrics fall back to the
    /// built-in, so partial overrides keep the rest of the profile's shape.
    /// The override's description wins when non-empty.
    pub fn merged_over(&self, base: &StyleProfile) -> StyleProfile {
        StyleProfile {
            name: self.name.clone(),
            description: if self.description.trim().is_empty() {
                base.description.clone()
            } else {
                self.description.clone()
            },
            ranges: self.ranges.merged_over(&base.ranges),
            origin: Origin::User,
        }
    }
}
