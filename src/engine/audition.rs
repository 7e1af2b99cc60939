//! Per-track role classification ("audition").
//!
//! Solo a track, analyze it, and ask two questions: what role is this
//! element playing, and how well does it fit what the style expects from
//! that role? Classification is a flat, prioritized list of rules evaluated
//! in fixed order, so the cascade stays auditable and easy to extend.
//!
//! Percussion is deliberately not auto-detected: transient density cannot
//! be derived from the band/MFCC/chroma summary this engine receives, so
//! the role is only reachable through an explicit caller override.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::scorer;
use crate::error::Result;
use crate::features::{Band, FeatureVector, MetricId};
use crate::profile::{RangeSet, StyleProfile};

/// Musical role of a soloed track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Bass,
    Lead,
    Pad,
    Percussion,
    Texture,
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Bass => "bass",
            Role::Lead => "lead",
            Role::Pad => "pad",
            Role::Percussion => "percussion",
            Role::Texture => "texture",
            Role::Unknown => "unknown",
        }
    }
}

/// Classification thresholds.
pub mod confidence {
    /// A rule must reach this confidence to claim the role.
    pub const MIN_MATCH: f64 = 0.6;

    /// Low-band share that counts as fully bass-dominant.
    pub const BASS_DOMINANT_SHARE: f64 = 0.6;

    /// Chroma concentration that counts as fully harmonic.
    pub const LEAD_HARMONIC_CONCENTRATION: f64 = 0.5;
}

/// Result of auditioning one track against one style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackAuditionResult {
    /// Style the fit was judged against.
    pub style: String,

    pub role: Role,

    /// Confidence of the winning rule (1.0 for an explicit override).
    pub confidence: f64,

    /// Cohesion of the track against the style's expectations for the
    /// classified role, 0-100.
    pub fit_score: f64,

    /// Bands in energy-descending order covering the bulk of the signal.
    pub dominant_bands: Vec<String>,

    /// The track's full band-energy map, echoed for the caller.
    pub frequency_profile: BTreeMap<String, f64>,
}

/// One entry in the classification cascade.
struct RoleRule {
    role: Role,
    confidence: fn(&FeatureVector) -> f64,
}

/// The cascade, in priority order.
const RULES: [RoleRule; 4] = [
    RoleRule {
        role: Role::Bass,
        confidence: bass_confidence,
    },
    RoleRule {
        role: Role::Lead,
        confidence: lead_confidence,
    },
    RoleRule {
        role: Role::Pad,
        confidence: pad_confidence,
    },
    RoleRule {
        role: Role::Texture,
        confidence: texture_confidence,
    },
];

fn band_share(features: &FeatureVector, bands: &[Band]) -> f64 {
    let total: f64 = features.frequency_band_energy.values().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let selected: f64 = bands.iter().filter_map(|b| features.band(*b)).sum();
    selected / total
}

/// Dominant low end with a dark centroid reads as a bass element.
fn bass_confidence(features: &FeatureVector) -> f64 {
    let low_share = band_share(features, &[Band::SubBass, Band::Bass]);
    let mut conf = (low_share / confidence::BASS_DOMINANT_SHARE).min(1.0);
    if features.brightness > 1200.0 {
        conf *= 0.4;
    }
    conf
}

/// Bright, pitched material with chroma energy piled into few bins.
fn lead_confidence(features: &FeatureVector) -> f64 {
    let total: f64 = features.chroma.iter().sum();
    if total <= 0.0 || features.chroma.is_empty() {
        return 0.0;
    }
    let peak = features.chroma.iter().cloned().fold(0.0, f64::max);
    let concentration = peak / total;

    let uniform = 1.0 / features.chroma.len() as f64;
    let mut conf = ((concentration - uniform)
        / (confidence::LEAD_HARMONIC_CONCENTRATION - uniform))
        .clamp(0.0, 1.0);

    if features.brightness < 800.0 {
        conf *= 0.3;
    }
    let mid_share = band_share(features, &[Band::Mid, Band::UpperMid, Band::Presence]);
    conf * (mid_share / 0.4).min(1.0)
}

/// Evenly spread band energy with a wide image reads as a pad.
fn pad_confidence(features: &FeatureVector) -> f64 {
    let values: Vec<f64> = Band::ALL
        .iter()
        .filter_map(|b| features.band(*b))
        .collect();
    if values.len() < Band::ALL.len() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let spread = variance.sqrt() / mean;

    let evenness = (1.0 - spread / 1.5).clamp(0.0, 1.0);
    let width = (features.stereo_width / 0.5).min(1.0);
    evenness * width
}

/// Quiet residue that claimed no other role.
fn texture_confidence(features: &FeatureVector) -> f64 {
    (1.0 - features.rms_mean / 0.1).clamp(0.0, 1.0)
}

/// Which metrics a role is judged on.
///
/// An empty slice means the role is judged against everything the profile
/// declares.
fn role_metrics(role: Role) -> &'static [MetricId] {
    match role {
        Role::Bass => &[
            MetricId::Band(Band::SubBass),
            MetricId::Band(Band::Bass),
            MetricId::DynamicRangeDb,
        ],
        Role::Lead => &[
            MetricId::Band(Band::Mid),
            MetricId::Band(Band::UpperMid),
            MetricId::Band(Band::Presence),
            MetricId::Brightness,
        ],
        Role::Pad => &[
            MetricId::Band(Band::LowMid),
            MetricId::Band(Band::Mid),
            MetricId::StereoWidth,
            MetricId::RmsMean,
        ],
        Role::Percussion => &[MetricId::DynamicRangeDb],
        Role::Texture | Role::Unknown => &[],
    }
}

/// The slice of `profile` a role is judged against.
fn role_profile(profile: &StyleProfile, role: Role) -> StyleProfile {
    let wanted = role_metrics(role);
    if wanted.is_empty() {
        return profile.clone();
    }

    let mut ranges = RangeSet::default();
    for id in wanted {
        let Some(range) = profile.range_for(*id) else { continue };
        match id {
            MetricId::Band(b) => {
                ranges
                    .frequency_balance
                    .insert(b.as_str().to_string(), range);
            }
            MetricId::DynamicRangeDb => ranges.dynamic_range_db = Some(range),
            MetricId::Brightness => ranges.brightness = Some(range),
            MetricId::StereoWidth => ranges.stereo_width = Some(range),
            MetricId::RmsMean => ranges.rms_mean = Some(range),
        }
    }

    StyleProfile::new(&profile.name, &profile.description, ranges)
}

/// Bands in energy-descending order until at least 60% of the total energy
/// is covered. Ties keep spectrum order.
fn dominant_bands(features: &FeatureVector) -> Vec<String> {
    let mut bands: Vec<(Band, f64)> = Band::ALL
        .iter()
        .filter_map(|b| features.band(*b).map(|e| (*b, e)))
        .collect();
    bands.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let total: f64 = bands.iter().map(|(_, e)| e).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut covered = 0.0;
    for (band, energy) in bands {
        out.push(band.as_str().to_string());
        covered += energy;
        if covered / total >= 0.6 {
            break;
        }
    }
    out
}

/// Classify a soloed track's role and judge its fit against a style.
///
/// `role_override` pins the role (confidence 1.0) and skips the cascade;
/// this is also the only path to [`Role::Percussion`].
pub fn audition(
    features: &FeatureVector,
    profile: &StyleProfile,
    role_override: Option<Role>,
) -> Result<TrackAuditionResult> {
    let (role, conf) = match role_override {
        Some(role) => (role, 1.0),
        None => classify(features),
    };

    let scoped = role_profile(profile, role);
    let fit = scorer::score(features, &scoped)?;

    Ok(TrackAuditionResult {
        style: profile.name.clone(),
        role,
        confidence: conf,
        fit_score: fit.cohesion_score,
        dominant_bands: dominant_bands(features),
        frequency_profile: features.frequency_band_energy.clone(),
    })
}

/// Run the cascade: first rule to reach the confidence floor wins.
fn classify(features: &FeatureVector) -> (Role, f64) {
    let mut best = (Role::Unknown, 0.0);
    for rule in &RULES {
        let conf = (rule.confidence)(features);
        if conf >= confidence::MIN_MATCH {
            return (rule.role, conf);
        }
        if conf > best.1 {
            best = (Role::Unknown, conf);
        }
    }
    best
}
