//! Scoring a feature vector against a style profile.
//!
//! Pure computation: no I/O, no side effects. For well-formed inputs the
//! only failure mode is a profile referencing a metric the vector does not
//! carry, which is reported as a typed error instead of silently defaulting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MixmeterError, Result};
use crate::features::{FeatureVector, MetricId};
use crate::profile::{Range, StyleProfile};

/// How one metric measured up against its target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricScore {
    /// The measured value.
    pub value: f64,

    /// The profile's target range, absent when the profile does not score
    /// this metric.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,

    /// True iff `low <= value <= high`, inclusive at both bounds.
    pub in_range: bool,

    /// Signed distance outside the range, normalized by range width:
    /// 0 inside, negative below, positive above. For a zero-width range the
    /// raw signed distance is reported instead (the width normalization
    /// would divide by zero).
    pub deviation: f64,

    /// `max(0, 1 - |deviation|)`, clamped to [0, 1]. Forced to 0 for any
    /// off-bound value against a zero-width range.
    pub fit: f64,
}

/// Result of scoring one feature vector against one profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Name of the profile scored against.
    pub style: String,

    /// Per-metric breakdown. Metrics the profile does not declare are still
    /// reported (with no range) but excluded from the aggregate.
    pub per_metric: BTreeMap<String, MetricScore>,

    /// Aggregate fit in [0, 100].
    pub cohesion_score: f64,
}

impl ScoreResult {
    /// Breakdown for a metric, if the vector carried it.
    pub fn metric(&self, id: MetricId) -> Option<&MetricScore> {
        self.per_metric.get(id.as_str())
    }
}

/// Deviation and fit for one value against one range.
///
/// Zero-width ranges treat any off-bound value as maximal misfit; a value
/// exactly on the bound is in range with full fit.
fn fit_against(value: f64, range: Range) -> (f64, f64) {
    if range.contains(value) {
        return (0.0, 1.0);
    }
    if range.width() == 0.0 {
        return (value - range.low, 0.0);
    }
    let deviation = range.signed_distance(value) / range.width();
    (deviation, (1.0 - deviation.abs()).max(0.0))
}

/// Score a feature vector against a style profile.
///
/// The cohesion score is `100 x weighted_mean(fit)` over the metrics the
/// profile declares; weights are uniform unless the profile names a metric
/// in its `weights` map. A profile declaring no metrics scores 100.
pub fn score(features: &FeatureVector, profile: &StyleProfile) -> Result<ScoreResult> {
    let mut per_metric = BTreeMap::new();
    let mut weighted_fit = 0.0;
    let mut total_weight = 0.0;

    for id in MetricId::ALL {
        let value = features.metric(id);
        let range = profile.range_for(id);

        match (value, range) {
            (Some(value), Some(range)) => {
                let (deviation, fit) = fit_against(value, range);
                let weight = profile.weight_for(id);
                weighted_fit += weight * fit;
                total_weight += weight;
                per_metric.insert(
                    id.as_str().to_string(),
                    MetricScore {
                        value,
                        range: Some(range),
                        in_range: range.contains(value),
                        deviation,
                        fit,
                    },
                );
            }
            (None, Some(_)) => {
                return Err(MixmeterError::MissingMetric {
                    metric: id.as_str().to_string(),
                });
            }
            (Some(value), None) => {
                per_metric.insert(
                    id.as_str().to_string(),
                    MetricScore {
                        value,
                        range: None,
                        in_range: true,
                        deviation: 0.0,
                        fit: 1.0,
                    },
                );
            }
            (None, None) => {}
        }
    }

    let cohesion_score = if total_weight > 0.0 {
        100.0 * weighted_fit / total_weight
    } else {
        100.0
    };

    Ok(ScoreResult {
        style: profile.name.clone(),
        per_metric,
        cohesion_score,
    })
}
