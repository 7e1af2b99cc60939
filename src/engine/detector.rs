//! Rule-based mix issue detection.
//!
//! Each issue kind is a named predicate over the scored metrics, evaluated
//! independently in declaration order; kinds are not mutually exclusive.
//! Detection only looks at metrics the profile declares; a band the profile
//! ignores never triggers an issue.

use serde::{Deserialize, Serialize};

use crate::engine::scorer::ScoreResult;
use crate::features::{Band, FeatureVector, MetricId};

/// Ordered issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// The detectable issue kinds, in evaluation (and tie-break) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// sub_bass and bass both well below target.
    ThinBass,
    /// Excess concentrated in low_mid while the mids are fine.
    Mud,
    /// Two or more adjacent bands over target at once.
    Masking,
    /// Upper mids/presence over target together with excess brightness.
    Harshness,
    /// sub_bass over target.
    Rumble,
    /// brilliance over target.
    Sibilance,
    /// Dynamic range below target.
    OverCompressed,
    /// Dynamic range above target.
    UnderCompressed,
    /// Brightness below target.
    Dullness,
    /// Stereo width above target.
    TooWide,
    /// Stereo width below target.
    TooNarrow,
}

impl IssueKind {
    /// All kinds in evaluation order.
    pub const ALL: [IssueKind; 11] = [
        IssueKind::ThinBass,
        IssueKind::Mud,
        IssueKind::Masking,
        IssueKind::Harshness,
        IssueKind::Rumble,
        IssueKind::Sibilance,
        IssueKind::OverCompressed,
        IssueKind::UnderCompressed,
        IssueKind::Dullness,
        IssueKind::TooWide,
        IssueKind::TooNarrow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::ThinBass => "thin_bass",
            IssueKind::Mud => "mud",
            IssueKind::Masking => "masking",
            IssueKind::Harshness => "harshness",
            IssueKind::Rumble => "rumble",
            IssueKind::Sibilance => "sibilance",
            IssueKind::OverCompressed => "over_compressed",
            IssueKind::UnderCompressed => "under_compressed",
            IssueKind::Dullness => "dullness",
            IssueKind::TooWide => "too_wide",
            IssueKind::TooNarrow => "too_narrow",
        }
    }
}

/// A detected qualitative mix problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    /// Metric names whose deviations triggered the issue.
    pub affected: Vec<String>,
    pub description: String,
}

/// Tunable detection constants.
///
/// The margins and severity tiers are reconstructions, not measured
/// constants; they are exposed here for tuning rather than hard-coded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Trigger margin for deficit heuristics, as a fraction of range width
    /// (default 0.5: more than half a range-width below `low`).
    pub margin_ratio: f64,

    /// Severity stays `low` while `|deviation| <= low_ceiling * margin_ratio`
    /// (default 1.5).
    pub low_ceiling: f64,

    /// Severity stays `medium` while
    /// `|deviation| <= medium_ceiling * margin_ratio` (default 3.0),
    /// `high` beyond.
    pub medium_ceiling: f64,

    /// Fit below which an otherwise issue-free metric earns a generic
    /// suggestion (default 0.5).
    pub borderline_fit: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            margin_ratio: 0.5,
            low_ceiling: 1.5,
            medium_ceiling: 3.0,
            borderline_fit: 0.5,
        }
    }
}

impl DetectorConfig {
    /// Severity for a normalized deviation magnitude.
    ///
    /// `zero_width` marks a deviation against a zero-width range, where the
    /// magnitude is a raw distance and any violation counts as maximal.
    fn severity(&self, magnitude: f64, zero_width: bool) -> Severity {
        if zero_width {
            return Severity::High;
        }
        if magnitude <= self.low_ceiling * self.margin_ratio {
            Severity::Low
        } else if magnitude <= self.medium_ceiling * self.margin_ratio {
            Severity::Medium
        } else {
            Severity::High
        }
    }
}

/// Deviation of a profile-declared metric, `None` when the profile does not
/// score it or the vector lacks it.
fn deviation(score: &ScoreResult, id: MetricId) -> Option<(f64, bool)> {
    let m = score.metric(id)?;
    let range = m.range?;
    Some((m.deviation, range.width() == 0.0))
}

fn over(score: &ScoreResult, id: MetricId) -> Option<(f64, bool)> {
    deviation(score, id).filter(|(d, _)| *d > 0.0)
}

fn under(score: &ScoreResult, id: MetricId) -> Option<(f64, bool)> {
    deviation(score, id).filter(|(d, _)| *d < 0.0)
}

/// True when the metric is either undeclared or sitting inside its range.
fn not_violating(score: &ScoreResult, id: MetricId) -> bool {
    match deviation(score, id) {
        Some((d, _)) => d == 0.0,
        None => true,
    }
}

fn describe(score: &ScoreResult, id: MetricId, direction: &str) -> String {
    match score.metric(id) {
        Some(m) => match m.range {
            Some(r) => format!(
                "{} ({:.4}) {} target range [{:.4}, {:.4}]",
                id,
                m.value,
                direction,
                r.low,
                r.high
            ),
            None => format!("{} ({:.4}) {} target", id, m.value, direction),
        },
        None => format!("{} {} target", id, direction),
    }
}

/// Detect issues over a feature vector and its score result.
///
/// Deterministic: identical inputs produce the identical issue sequence.
pub fn detect(
    _features: &FeatureVector,
    score: &ScoreResult,
    config: &DetectorConfig,
) -> Vec<Issue> {
    let mut issues = Vec::new();

    for kind in IssueKind::ALL {
        if let Some(issue) = check(kind, score, config) {
            issues.push(issue);
        }
    }

    issues
}

fn check(kind: IssueKind, score: &ScoreResult, config: &DetectorConfig) -> Option<Issue> {
    match kind {
        IssueKind::ThinBass => {
            let (d_sub, zw_sub) = under(score, MetricId::Band(Band::SubBass))?;
            let (d_bass, zw_bass) = under(score, MetricId::Band(Band::Bass))?;
            let triggered = (d_sub.abs() > config.margin_ratio || zw_sub)
                && (d_bass.abs() > config.margin_ratio || zw_bass);
            if !triggered {
                return None;
            }
            let magnitude = d_sub.abs().max(d_bass.abs());
            Some(Issue {
                kind,
                severity: config.severity(magnitude, zw_sub || zw_bass),
                affected: vec!["sub_bass".to_string(), "bass".to_string()],
                description: format!(
                    "{}; {}",
                    describe(score, MetricId::Band(Band::SubBass), "well below"),
                    describe(score, MetricId::Band(Band::Bass), "well below")
                ),
            })
        }

        IssueKind::Mud => {
            let (d, zw) = over(score, MetricId::Band(Band::LowMid))?;
            let mids_clean = not_violating(score, MetricId::Band(Band::Mid))
                && not_violating(score, MetricId::Band(Band::UpperMid));
            if !mids_clean {
                return None;
            }
            Some(Issue {
                kind,
                severity: config.severity(d.abs(), zw),
                affected: vec!["low_mid".to_string()],
                description: describe(score, MetricId::Band(Band::LowMid), "exceeds"),
            })
        }

        IssueKind::Masking => {
            let overs: Vec<(Band, f64, bool)> = Band::ALL
                .iter()
                .filter_map(|b| over(score, MetricId::Band(*b)).map(|(d, zw)| (*b, d, zw)))
                .collect();

            // Keep only bands participating in an adjacent over-energy pair.
            let mut crowded: Vec<(Band, f64, bool)> = Vec::new();
            for (band, d, zw) in &overs {
                let adjacent = overs
                    .iter()
                    .any(|(other, _, _)| other.index().abs_diff(band.index()) == 1);
                if adjacent {
                    crowded.push((*band, *d, *zw));
                }
            }
            if crowded.len() < 2 {
                return None;
            }

            let magnitude = crowded.iter().map(|(_, d, _)| d.abs()).fold(0.0, f64::max);
            let zero_width = crowded.iter().any(|(_, _, zw)| *zw);
            Some(Issue {
                kind,
                severity: config.severity(magnitude, zero_width),
                affected: crowded.iter().map(|(b, _, _)| b.as_str().to_string()).collect(),
                description: format!(
                    "adjacent bands over target: {}",
                    crowded
                        .iter()
                        .map(|(b, _, _)| b.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })
        }

        IssueKind::Harshness => {
            let upper = over(score, MetricId::Band(Band::UpperMid));
            let presence = over(score, MetricId::Band(Band::Presence));
            if upper.is_none() && presence.is_none() {
                return None;
            }
            let (d_bright, zw_bright) = over(score, MetricId::Brightness)?;

            let mut affected = Vec::new();
            let mut magnitude = d_bright.abs();
            let mut zero_width = zw_bright;
            if let Some((d, zw)) = upper {
                affected.push("upper_mid".to_string());
                magnitude = magnitude.max(d.abs());
                zero_width |= zw;
            }
            if let Some((d, zw)) = presence {
                affected.push("presence".to_string());
                magnitude = magnitude.max(d.abs());
                zero_width |= zw;
            }
            affected.push("brightness".to_string());

            Some(Issue {
                kind,
                severity: config.severity(magnitude, zero_width),
                affected,
                description: format!(
                    "{} with excess high-frequency band energy; mix may sound harsh or brittle",
                    describe(score, MetricId::Brightness, "exceeds")
                ),
            })
        }

        IssueKind::Rumble => single_over(score, config, kind, MetricId::Band(Band::SubBass)),
        IssueKind::Sibilance => single_over(score, config, kind, MetricId::Band(Band::Brilliance)),
        IssueKind::OverCompressed => single_under(score, config, kind, MetricId::DynamicRangeDb),
        IssueKind::UnderCompressed => single_over(score, config, kind, MetricId::DynamicRangeDb),
        IssueKind::Dullness => single_under(score, config, kind, MetricId::Brightness),
        IssueKind::TooWide => single_over(score, config, kind, MetricId::StereoWidth),
        IssueKind::TooNarrow => single_under(score, config, kind, MetricId::StereoWidth),
    }
}

fn single_over(
    score: &ScoreResult,
    config: &DetectorConfig,
    kind: IssueKind,
    id: MetricId,
) -> Option<Issue> {
    let (d, zw) = over(score, id)?;
    Some(Issue {
        kind,
        severity: config.severity(d.abs(), zw),
        affected: vec![id.as_str().to_string()],
        description: describe(score, id, "exceeds"),
    })
}

fn single_under(
    score: &ScoreResult,
    config: &DetectorConfig,
    kind: IssueKind,
    id: MetricId,
) -> Option<Issue> {
    let (d, zw) = under(score, id)?;
    Some(Issue {
        kind,
        severity: config.severity(d.abs(), zw),
        affected: vec![id.as_str().to_string()],
        description: describe(score, id, "below"),
    })
}
