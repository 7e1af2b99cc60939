//! Feature vector data contract.
//!
//! A [`FeatureVector`] is the immutable measurement record produced by the
//! external analyzer for one audio capture. The engine never computes these
//! values itself; it consumes them as a completed value (JSON at the CLI
//! boundary). Unknown fields are tolerated and preserved so newer analyzers
//! can ship extra measurements without breaking older engines.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MixmeterError, Result};

/// The seven analysis bands, in spectrum order.
///
/// Adjacency in this ordering is what the masking heuristic means by
/// "adjacent bands".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    /// 20-60 Hz
    SubBass,
    /// 60-250 Hz
    Bass,
    /// 250-500 Hz
    LowMid,
    /// 500-2000 Hz
    Mid,
    /// 2000-4000 Hz
    UpperMid,
    /// 4000-6000 Hz
    Presence,
    /// 6000-20000 Hz
    Brilliance,
}

impl Band {
    /// All bands in spectrum order.
    pub const ALL: [Band; 7] = [
        Band::SubBass,
        Band::Bass,
        Band::LowMid,
        Band::Mid,
        Band::UpperMid,
        Band::Presence,
        Band::Brilliance,
    ];

    /// Canonical snake_case name, matching the JSON key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::SubBass => "sub_bass",
            Band::Bass => "bass",
            Band::LowMid => "low_mid",
            Band::Mid => "mid",
            Band::UpperMid => "upper_mid",
            Band::Presence => "presence",
            Band::Brilliance => "brilliance",
        }
    }

    /// Parse a canonical band name.
    pub fn from_name(name: &str) -> Option<Band> {
        Band::ALL.iter().copied().find(|b| b.as_str() == name)
    }

    /// Position in spectrum order.
    pub fn index(&self) -> usize {
        Band::ALL.iter().position(|b| b == self).unwrap_or(0)
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier for every scorable metric.
///
/// Declaration order (bands in spectrum order, then the scalar metrics) is
/// stable and drives deterministic iteration, suggestion tie-breaking, and
/// snapshot delta ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricId {
    Band(Band),
    DynamicRangeDb,
    Brightness,
    StereoWidth,
    RmsMean,
}

impl MetricId {
    /// All scorable metrics in declaration order.
    pub const ALL: [MetricId; 11] = [
        MetricId::Band(Band::SubBass),
        MetricId::Band(Band::Bass),
        MetricId::Band(Band::LowMid),
        MetricId::Band(Band::Mid),
        MetricId::Band(Band::UpperMid),
        MetricId::Band(Band::Presence),
        MetricId::Band(Band::Brilliance),
        MetricId::DynamicRangeDb,
        MetricId::Brightness,
        MetricId::StereoWidth,
        MetricId::RmsMean,
    ];

    /// Canonical metric name used in results and profiles.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricId::Band(b) => b.as_str(),
            MetricId::DynamicRangeDb => "dynamic_range_db",
            MetricId::Brightness => "brightness",
            MetricId::StereoWidth => "stereo_width",
            MetricId::RmsMean => "rms_mean",
        }
    }

    /// Parse a canonical metric name.
    pub fn from_name(name: &str) -> Option<MetricId> {
        MetricId::ALL.iter().copied().find(|m| m.as_str() == name)
    }

    /// Position in declaration order, used for stable tie-breaking.
    pub fn order(&self) -> usize {
        MetricId::ALL.iter().position(|m| m == self).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured measurements for one audio capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Normalized energy fraction per band (non-negative, summing to ~1).
    pub frequency_band_energy: BTreeMap<String, f64>,

    /// Mean RMS loudness.
    pub rms_mean: f64,

    /// Peak RMS loudness.
    pub rms_peak: f64,

    /// Peak-to-RMS spread in dB.
    pub dynamic_range_db: f64,

    /// Spectral centroid mean in Hz.
    pub brightness: f64,

    /// 0 = mono, 1 = maximally decorrelated.
    pub stereo_width: f64,

    /// MFCC means, used only by the auditioner.
    #[serde(default)]
    pub mfcc: Vec<f64>,

    /// Chroma bin means, used only by the auditioner.
    #[serde(default)]
    pub chroma: Vec<f64>,

    /// Capture sample rate, if the analyzer reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,

    /// Capture duration in seconds, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,

    /// Capture channel count, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_channels: Option<u8>,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

impl FeatureVector {
    /// Energy fraction for a band, if the analyzer reported it.
    pub fn band(&self, band: Band) -> Option<f64> {
        self.frequency_band_energy.get(band.as_str()).copied()
    }

    /// Uniform scalar-metric access.
    ///
    /// Returns `None` only for bands absent from the analyzer's map; the
    /// scalar metrics are always present once a vector deserializes.
    pub fn metric(&self, id: MetricId) -> Option<f64> {
        match id {
            MetricId::Band(b) => self.band(b),
            MetricId::DynamicRangeDb => Some(self.dynamic_range_db),
            MetricId::Brightness => Some(self.brightness),
            MetricId::StereoWidth => Some(self.stereo_width),
            MetricId::RmsMean => Some(self.rms_mean),
        }
    }

    /// Check that every measured value is finite and in its domain.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in &self.frequency_band_energy {
            if !value.is_finite() || *value < 0.0 {
                return Err(MixmeterError::InvalidFeatures {
                    reason: format!("band '{}' energy {} is not a finite non-negative value", name, value),
                });
            }
        }

        let scalars = [
            ("rms_mean", self.rms_mean),
            ("rms_peak", self.rms_peak),
            ("dynamic_range_db", self.dynamic_range_db),
            ("brightness", self.brightness),
            ("stereo_width", self.stereo_width),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                return Err(MixmeterError::InvalidFeatures {
                    reason: format!("{} is not finite", name),
                });
            }
        }

        if self.rms_mean < 0.0 || self.rms_peak < 0.0 || self.dynamic_range_db < 0.0 {
            return Err(MixmeterError::InvalidFeatures {
                reason: "loudness statistics must be non-negative".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.stereo_width) {
            return Err(MixmeterError::InvalidFeatures {
                reason: format!("stereo_width {} outside [0, 1]", self.stereo_width),
            });
        }

        if self.mfcc.iter().chain(self.chroma.iter()).any(|v| !v.is_finite()) {
            return Err(MixmeterError::InvalidFeatures {
                reason: "mfcc/chroma contain non-finite values".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vector() -> FeatureVector {
        let mut bands = BTreeMap::new();
        for band in Band::ALL {
            bands.insert(band.as_str().to_string(), 1.0 / 7.0);
        }
        FeatureVector {
            frequency_band_energy: bands,
            rms_mean: 0.1,
            rms_peak: 0.4,
            dynamic_range_db: 12.0,
            brightness: 2400.0,
            stereo_width: 0.3,
            mfcc: vec![0.0; 13],
            chroma: vec![1.0 / 12.0; 12],
            sample_rate: Some(44100),
            duration_secs: Some(5.0),
            num_channels: Some(2),
            unknown_fields: HashMap::new(),
        }
    }

    #[test]
    fn test_band_names_roundtrip() {
        for band in Band::ALL {
            assert_eq!(Band::from_name(band.as_str()), Some(band));
        }
        assert_eq!(Band::from_name("treble"), None);
    }

    #[test]
    fn test_metric_order_is_stable() {
        assert_eq!(MetricId::Band(Band::SubBass).order(), 0);
        assert_eq!(MetricId::RmsMean.order(), MetricId::ALL.len() - 1);
        assert!(MetricId::DynamicRangeDb.order() < MetricId::Brightness.order());
    }

    #[test]
    fn test_metric_access() {
        let fv = sample_vector();
        assert_eq!(fv.metric(MetricId::Brightness), Some(2400.0));
        assert!(fv.metric(MetricId::Band(Band::Mid)).is_some());

        let mut thin = fv.clone();
        thin.frequency_band_energy.remove("mid");
        assert_eq!(thin.metric(MetricId::Band(Band::Mid)), None);
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let json = r#"{
            "frequency_band_energy": {"mid": 0.5},
            "rms_mean": 0.1,
            "rms_peak": 0.3,
            "dynamic_range_db": 10.0,
            "brightness": 1500.0,
            "stereo_width": 0.2,
            "spectral_flatness": 0.42
        }"#;
        let fv: FeatureVector = serde_json::from_str(json).unwrap();
        assert!(fv.unknown_fields.contains_key("spectral_flatness"));

        let out = serde_json::to_string(&fv).unwrap();
        assert!(out.contains("spectral_flatness"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut fv = sample_vector();
        fv.stereo_width = 1.5;
        assert!(fv.validate().is_err());

        let mut fv = sample_vector();
        fv.brightness = f64::NAN;
        assert!(fv.validate().is_err());

        let mut fv = sample_vector();
        fv.frequency_band_energy.insert("bass".to_string(), -0.1);
        assert!(fv.validate().is_err());

        assert!(sample_vector().validate().is_ok());
    }
}
