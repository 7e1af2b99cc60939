//! The evaluation engine: scoring, issue detection, suggestions, audition.
//!
//! Everything in this module is pure computation over a feature vector and
//! a style profile; persistence lives in the profile store and snapshot
//! repository.

pub mod audition;
pub mod detector;
pub mod scorer;
pub mod suggest;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::features::FeatureVector;
use crate::profile::StyleProfile;

pub use audition::{audition, Role, TrackAuditionResult};
pub use detector::{detect, DetectorConfig, Issue, IssueKind, Severity};
pub use scorer::{score, MetricScore, ScoreResult};
pub use suggest::{suggest, Suggestion};

/// Full evaluation of one capture against one style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixEvaluation {
    pub style: String,
    pub cohesion_score: f64,
    pub per_metric: std::collections::BTreeMap<String, MetricScore>,
    pub issues: Vec<Issue>,
    pub suggestions: Vec<Suggestion>,
}

/// Run the whole pipeline: score, detect, suggest.
pub fn evaluate(
    features: &FeatureVector,
    profile: &StyleProfile,
    config: &DetectorConfig,
) -> Result<MixEvaluation> {
    let score_result = score(features, profile)?;
    let issues = detect(features, &score_result, config);
    let suggestions = suggest(features, &score_result, &issues, config);

    Ok(MixEvaluation {
        style: score_result.style,
        cohesion_score: score_result.cohesion_score,
        per_metric: score_result.per_metric,
        issues,
        suggestions,
    })
}
