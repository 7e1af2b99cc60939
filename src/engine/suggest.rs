//! Actionable suggestions from detected issues and borderline metrics.
//!
//! Every detected issue maps to one templated suggestion; profile-declared
//! metrics with a poor fit that no issue already covers earn a generic
//! lower-severity nudge. The output ordering is total and reproducible:
//! severity descending, ties broken by the declaration order of the source
//! issue kind or metric.

use serde::{Deserialize, Serialize};

use crate::engine::detector::{DetectorConfig, Issue, IssueKind, Severity};
use crate::engine::scorer::ScoreResult;
use crate::features::{Band, FeatureVector, MetricId};

/// One actionable piece of advice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub severity: Severity,
    /// The issue kind or metric name this suggestion came from.
    pub source: String,
}

fn issue_advice(issue: &Issue) -> String {
    match issue.kind {
        IssueKind::ThinBass => {
            "Low end is underpowered: boost sub-bass with a low shelf or saturator below 60 Hz and add warmth around 80-150 Hz.".to_string()
        }
        IssueKind::Mud => {
            "Dip the 250-500 Hz region to clear boxy buildup.".to_string()
        }
        IssueKind::Masking => format!(
            "Energy is crowding adjacent bands ({}): carve complementary EQ cuts so elements stop fighting for the same space.",
            issue.affected.join(", ")
        ),
        IssueKind::Harshness => {
            "Attenuate 2-4 kHz and roll off highs with a shelf EQ to reduce harshness and listening fatigue.".to_string()
        }
        IssueKind::Rumble => {
            "Apply a high-pass filter around 30-40 Hz to tame sub-bass rumble.".to_string()
        }
        IssueKind::Sibilance => {
            "Roll off above 10 kHz or de-ess vocals to control sibilance.".to_string()
        }
        IssueKind::OverCompressed => {
            "Reduce compression ratio or raise threshold to restore dynamics.".to_string()
        }
        IssueKind::UnderCompressed => {
            "Apply gentle bus compression to tighten the dynamic range.".to_string()
        }
        IssueKind::Dullness => {
            "Add a subtle high-shelf boost around 8-12 kHz for air.".to_string()
        }
        IssueKind::TooWide => {
            "Narrow the stereo image on low-frequency elements; check mono compatibility.".to_string()
        }
        IssueKind::TooNarrow => {
            "Use subtle stereo widening on pads/reverbs, or pan elements further apart.".to_string()
        }
    }
}

fn band_reduction(band: Band) -> &'static str {
    match band {
        Band::SubBass => "Apply a high-pass filter around 30-40 Hz to tame sub-bass rumble.",
        Band::Bass => "Cut 2-3 dB in the 100-250 Hz range to reduce muddiness.",
        Band::LowMid => "Dip the 250-500 Hz region to clear boxy buildup.",
        Band::Mid => "Scoop 1-2 dB around 500-2000 Hz to reduce masking between elements.",
        Band::UpperMid => "Attenuate 2-4 kHz to reduce harshness and listening fatigue.",
        Band::Presence => "Tame 4-6 kHz with a gentle cut to soften presence-range aggression.",
        Band::Brilliance => "Roll off above 10 kHz or de-ess vocals to control sibilance.",
    }
}

fn band_boost(band: Band) -> &'static str {
    match band {
        Band::SubBass => "Boost sub-bass with a low shelf or saturator below 60 Hz.",
        Band::Bass => "Add warmth with a gentle boost around 80-150 Hz.",
        Band::LowMid => "A small lift around 300-400 Hz can add body to thin mixes.",
        Band::Mid => "Boost midrange presence to help vocals and leads cut through.",
        Band::UpperMid => "A lift around 2-4 kHz adds clarity and articulation.",
        Band::Presence => "Boost 4-6 kHz for more definition and attack.",
        Band::Brilliance => "Add a high shelf boost above 8 kHz for air and sparkle.",
    }
}

/// Generic advice for a metric nobody flagged, aimed in the direction of
/// its deviation.
fn metric_advice(id: MetricId, deviation: f64) -> String {
    match id {
        MetricId::Band(band) if deviation > 0.0 => band_reduction(band).to_string(),
        MetricId::Band(band) => band_boost(band).to_string(),
        MetricId::Brightness if deviation > 0.0 => {
            "Roll off highs with a low-pass or shelf EQ above 8 kHz to reduce brightness.".to_string()
        }
        MetricId::Brightness => {
            "Add a subtle high-shelf boost around 8-12 kHz for air.".to_string()
        }
        _ => format!("Bring {} toward the target range.", id),
    }
}

/// Generate the ranked suggestion list for one evaluation.
pub fn suggest(
    _features: &FeatureVector,
    score: &ScoreResult,
    issues: &[Issue],
    config: &DetectorConfig,
) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = Vec::new();

    for issue in issues {
        suggestions.push(Suggestion {
            text: issue_advice(issue),
            severity: issue.severity,
            source: issue.kind.as_str().to_string(),
        });
    }

    // Profile-declared metrics with a poor fit that no issue already names.
    for id in MetricId::ALL {
        let Some(m) = score.metric(id) else { continue };
        if m.range.is_none() || m.fit >= config.borderline_fit {
            continue;
        }
        let name = id.as_str();
        if issues.iter().any(|i| i.affected.iter().any(|a| a == name)) {
            continue;
        }
        suggestions.push(Suggestion {
            text: metric_advice(id, m.deviation),
            severity: Severity::Low,
            source: name.to_string(),
        });
    }

    // Stable sort: ties keep the declaration order established above.
    suggestions.sort_by(|a, b| b.severity.cmp(&a.severity));
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::detector::detect;
    use crate::engine::scorer::score;
    use crate::features::FeatureVector;
    use crate::profile::{Range, RangeSet, StyleProfile};
    use std::collections::BTreeMap;

    fn features(bands: &[(Band, f64)]) -> FeatureVector {
        let mut map = BTreeMap::new();
        for (band, energy) in bands {
            map.insert(band.as_str().to_string(), *energy);
        }
        FeatureVector {
            frequency_band_energy: map,
            rms_mean: 0.1,
            rms_peak: 0.4,
            dynamic_range_db: 12.0,
            brightness: 2000.0,
            stereo_width: 0.4,
            mfcc: Vec::new(),
            chroma: Vec::new(),
            sample_rate: None,
            duration_secs: None,
            num_channels: None,
            unknown_fields: Default::default(),
        }
    }

    #[test]
    fn test_suggestions_sorted_by_severity_desc() {
        let mut ranges = RangeSet::default();
        ranges
            .frequency_balance
            .insert("sub_bass".to_string(), Range::new(0.1, 0.2));
        ranges
            .frequency_balance
            .insert("bass".to_string(), Range::new(0.1, 0.2));
        ranges.stereo_width = Some(Range::new(0.2, 0.5));
        let profile = StyleProfile::new("test", "", ranges);
        let config = DetectorConfig::default();

        // thin_bass lands high (far below), too_wide lands low (just over).
        let mut fv = features(&[(Band::SubBass, -0.1), (Band::Bass, -0.1)]);
        fv.stereo_width = 0.52;
        let result = score(&fv, &profile).unwrap();
        let issues = detect(&fv, &result, &config);
        let suggestions = suggest(&fv, &result, &issues, &config);

        assert!(!suggestions.is_empty());
        for pair in suggestions.windows(2) {
            assert!(pair[0].severity >= pair[1].severity);
        }
        assert_eq!(suggestions[0].source, "thin_bass");
    }

    #[test]
    fn test_identical_inputs_identical_output() {
        let mut ranges = RangeSet::default();
        ranges
            .frequency_balance
            .insert("low_mid".to_string(), Range::new(0.0, 0.1));
        ranges
            .frequency_balance
            .insert("mid".to_string(), Range::new(0.0, 0.1));
        ranges.dynamic_range_db = Some(Range::new(8.0, 16.0));
        let profile = StyleProfile::new("test", "", ranges);
        let config = DetectorConfig::default();

        let mut fv = features(&[(Band::LowMid, 0.4), (Band::Mid, 0.4)]);
        fv.dynamic_range_db = 2.0;
        let result = score(&fv, &profile).unwrap();
        let issues = detect(&fv, &result, &config);

        let a = suggest(&fv, &result, &issues, &config);
        let b = suggest(&fv, &result, &issues, &config);
        let render = |s: &[Suggestion]| {
            s.iter()
                .map(|x| format!("{:?}|{}|{}", x.severity, x.source, x.text))
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(render(&a), render(&b));
    }

    #[test]
    fn test_brightness_over_without_co_condition_gets_generic_advice() {
        // The lo-fi scenario: brightness 4000 against [500, 1800] with calm
        // upper mids yields only a generic "reduce brightness" nudge.
        let mut ranges = RangeSet::default();
        ranges
            .frequency_balance
            .insert("upper_mid".to_string(), Range::new(0.0, 0.2));
        ranges
            .frequency_balance
            .insert("presence".to_string(), Range::new(0.0, 0.2));
        ranges.brightness = Some(Range::new(500.0, 1800.0));
        let profile = StyleProfile::new("lo-fi", "", ranges);
        let config = DetectorConfig::default();

        let mut fv = features(&[(Band::UpperMid, 0.1), (Band::Presence, 0.1)]);
        fv.brightness = 4000.0;
        let result = score(&fv, &profile).unwrap();
        let issues = detect(&fv, &result, &config);
        assert!(issues.iter().all(|i| i.kind != IssueKind::Harshness));

        let suggestions = suggest(&fv, &result, &issues, &config);
        let brightness: Vec<_> = suggestions
            .iter()
            .filter(|s| s.source == "brightness")
            .collect();
        assert_eq!(brightness.len(), 1);
        assert!(brightness[0].text.contains("reduce brightness"));
        assert_eq!(brightness[0].severity, Severity::Low);
    }

    #[test]
    fn test_no_suggestions_for_unprofiled_metrics() {
        let profile = StyleProfile::new("empty", "", RangeSet::default());
        let config = DetectorConfig::default();

        let mut fv = features(&[(Band::Mid, 0.95)]);
        fv.brightness = 18000.0;
        let result = score(&fv, &profile).unwrap();
        let issues = detect(&fv, &result, &config);
        let suggestions = suggest(&fv, &result, &issues, &config);
        assert!(suggestions.is_empty());
    }

    #[test]
    fn test_issue_metric_not_doubled_as_generic() {
        let mut ranges = RangeSet::default();
        ranges.dynamic_range_db = Some(Range::new(8.0, 16.0));
        let profile = StyleProfile::new("test", "", ranges);
        let config = DetectorConfig::default();

        let mut fv = features(&[]);
        fv.dynamic_range_db = 1.0;
        let result = score(&fv, &profile).unwrap();
        let issues = detect(&fv, &result, &config);
        let suggestions = suggest(&fv, &result, &issues, &config);

        // over_compressed covers dynamic_range_db; no extra generic line.
        let sources: Vec<_> = suggestions.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(sources, vec!["over_compressed"]);
    }
}
