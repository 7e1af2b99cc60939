//! Named snapshot storage and comparison.
//!
//! A snapshot is a feature vector captured at a point in time and filed
//! under a caller-chosen name, so a later capture can be compared against
//! it ("what did my EQ pass actually change?"). Records live in a single
//! JSON manifest under a user-writable directory; snapshots are only ever
//! created, overwritten, or deleted by explicit request.
//!
//! The manifest is written to a temp file and renamed into place, and an
//! in-process lock serializes writers (last writer wins on a concurrent
//! save to the same name) while readers proceed concurrently.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{MixmeterError, Result};
use crate::features::FeatureVector;

const MANIFEST_FILE: &str = "snapshots.json";

/// A named, persisted feature vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    pub features: FeatureVector,
    pub captured_at: DateTime<Utc>,
    /// Style the mix was being evaluated against at capture time, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// Manifest tracking all snapshots, keyed by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SnapshotManifest {
    snapshots: BTreeMap<String, Snapshot>,
}

/// Direction of a metric's change between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increased,
    Decreased,
    Unchanged,
}

/// Coarse size of a metric's change, relative to the metric's own scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaMagnitude {
    Unchanged,
    Slight,
    Moderate,
    Large,
}

/// Change of one metric from snapshot `a` to snapshot `b`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<f64>,
    /// `after - before`; absent when either side lacks the metric.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<DeltaMagnitude>,
}

/// Directional comparison of two snapshots (a -> b).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotComparison {
    pub a: String,
    pub b: String,
    /// Union of both snapshots' metrics.
    pub deltas: BTreeMap<String, MetricDelta>,
}

fn classify(before: f64, after: f64) -> (Direction, DeltaMagnitude) {
    let delta = after - before;
    let direction = if delta > 0.0 {
        Direction::Increased
    } else if delta < 0.0 {
        Direction::Decreased
    } else {
        Direction::Unchanged
    };

    let scale = before.abs().max(after.abs()).max(1e-9);
    let relative = delta.abs() / scale;
    let magnitude = if relative < 0.01 {
        DeltaMagnitude::Unchanged
    } else if relative < 0.1 {
        DeltaMagnitude::Slight
    } else if relative < 0.3 {
        DeltaMagnitude::Moderate
    } else {
        DeltaMagnitude::Large
    };

    (direction, magnitude)
}

fn delta_entry(before: Option<f64>, after: Option<f64>) -> MetricDelta {
    match (before, after) {
        (Some(before), Some(after)) => {
            let (direction, magnitude) = classify(before, after);
            MetricDelta {
                before: Some(before),
                after: Some(after),
                delta: Some(after - before),
                direction: Some(direction),
                magnitude: Some(magnitude),
            }
        }
        _ => MetricDelta {
            before,
            after,
            delta: None,
            direction: None,
            magnitude: None,
        },
    }
}

/// Per-metric deltas over the union of both vectors' metrics.
fn diff_features(a: &FeatureVector, b: &FeatureVector) -> BTreeMap<String, MetricDelta> {
    let mut deltas = BTreeMap::new();

    let band_names: std::collections::BTreeSet<&String> = a
        .frequency_band_energy
        .keys()
        .chain(b.frequency_band_energy.keys())
        .collect();
    for name in band_names {
        deltas.insert(
            name.clone(),
            delta_entry(
                a.frequency_band_energy.get(name).copied(),
                b.frequency_band_energy.get(name).copied(),
            ),
        );
    }

    let scalars = [
        ("rms_mean", a.rms_mean, b.rms_mean),
        ("rms_peak", a.rms_peak, b.rms_peak),
        ("dynamic_range_db", a.dynamic_range_db, b.dynamic_range_db),
        ("brightness", a.brightness, b.brightness),
        ("stereo_width", a.stereo_width, b.stereo_width),
    ];
    for (name, va, vb) in scalars {
        deltas.insert(name.to_string(), delta_entry(Some(va), Some(vb)));
    }

    for (label, seq_a, seq_b) in [("mfcc", &a.mfcc, &b.mfcc), ("chroma", &a.chroma, &b.chroma)] {
        let len = seq_a.len().max(seq_b.len());
        for i in 0..len {
            deltas.insert(
                format!("{}[{}]", label, i),
                delta_entry(seq_a.get(i).copied(), seq_b.get(i).copied()),
            );
        }
    }

    deltas
}

/// Stores snapshots under a user-writable directory.
pub struct SnapshotRepository {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl SnapshotRepository {
    /// Create a repository over a directory; nothing is written until the
    /// first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    fn load_manifest(&self) -> Result<SnapshotManifest> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(SnapshotManifest::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| MixmeterError::FileReadError {
            path: path.clone(),
            source: e,
        })?;
        let manifest: SnapshotManifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    fn save_manifest(&self, manifest: &SnapshotManifest) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| MixmeterError::DirectoryCreateError {
                path: self.dir.clone(),
                source: e,
            })?;
        }

        let path = self.manifest_path();
        let tmp_path = self.dir.join(format!("{}.tmp", MANIFEST_FILE));
        let content = serde_json::to_string_pretty(manifest)?;

        fs::write(&tmp_path, content).map_err(|e| MixmeterError::FileWriteError {
            path: tmp_path.clone(),
            source: e,
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| MixmeterError::FileWriteError {
            path,
            source: e,
        })?;
        Ok(())
    }

    /// Save a snapshot, overwriting any existing record of the same name.
    pub fn save(
        &self,
        name: &str,
        features: FeatureVector,
        style: Option<&str>,
    ) -> Result<Snapshot> {
        let _guard = self.lock.write().expect("snapshot lock poisoned");

        let snapshot = Snapshot {
            name: name.to_string(),
            features,
            captured_at: Utc::now(),
            style: style.map(str::to_string),
        };

        let mut manifest = self.load_manifest()?;
        manifest
            .snapshots
            .insert(name.to_string(), snapshot.clone());
        self.save_manifest(&manifest)?;

        debug!("saved snapshot '{}'", name);
        Ok(snapshot)
    }

    /// Fetch a snapshot by name.
    pub fn get(&self, name: &str) -> Result<Snapshot> {
        let _guard = self.lock.read().expect("snapshot lock poisoned");

        let manifest = self.load_manifest()?;
        manifest
            .snapshots
            .get(name)
            .cloned()
            .ok_or_else(|| MixmeterError::SnapshotNotFound {
                name: name.to_string(),
            })
    }

    /// All snapshot names, most recently captured first.
    pub fn list(&self) -> Result<Vec<String>> {
        let _guard = self.lock.read().expect("snapshot lock poisoned");

        let manifest = self.load_manifest()?;
        let mut entries: Vec<(String, DateTime<Utc>)> = manifest
            .snapshots
            .into_iter()
            .map(|(name, snap)| (name, snap.captured_at))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(entries.into_iter().map(|(name, _)| name).collect())
    }

    /// Delete a snapshot by name.
    pub fn delete(&self, name: &str) -> Result<()> {
        let _guard = self.lock.write().expect("snapshot lock poisoned");

        let mut manifest = self.load_manifest()?;
        if manifest.snapshots.remove(name).is_none() {
            return Err(MixmeterError::SnapshotNotFound {
                name: name.to_string(),
            });
        }
        self.save_manifest(&manifest)?;

        debug!("deleted snapshot '{}'", name);
        Ok(())
    }

    /// Per-metric deltas from snapshot `a` to snapshot `b`.
    pub fn compare(&self, name_a: &str, name_b: &str) -> Result<SnapshotComparison> {
        let _guard = self.lock.read().expect("snapshot lock poisoned");

        let manifest = self.load_manifest()?;
        let lookup = |name: &str| {
            manifest
                .snapshots
                .get(name)
                .ok_or_else(|| MixmeterError::SnapshotNotFound {
                    name: name.to_string(),
                })
        };
        let a = lookup(name_a)?;
        let b = lookup(name_b)?;

        Ok(SnapshotComparison {
            a: name_a.to_string(),
            b: name_b.to_string(),
            deltas: diff_features(&a.features, &b.features),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Band;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap as Map;
    use tempfile::TempDir;

    fn repo() -> (TempDir, SnapshotRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = SnapshotRepository::new(dir.path().join("snapshots"));
        (dir, repo)
    }

    fn vector(rms_mean: f64) -> FeatureVector {
        let mut bands = Map::new();
        for band in Band::ALL {
            bands.insert(band.as_str().to_string(), 1.0 / 7.0);
        }
        FeatureVector {
            frequency_band_energy: bands,
            rms_mean,
            rms_peak: 0.5,
            dynamic_range_db: 12.0,
            brightness: 2000.0,
            stereo_width: 0.4,
            mfcc: vec![1.0, 2.0, 3.0],
            chroma: vec![0.1, 0.2],
            sample_rate: Some(44100),
            duration_secs: Some(5.0),
            num_channels: Some(2),
            unknown_fields: Default::default(),
        }
    }

    #[test]
    fn test_save_get_roundtrip() {
        let (_dir, repo) = repo();
        repo.save("before_eq", vector(0.1), Some("techno")).unwrap();

        let snap = repo.get("before_eq").unwrap();
        assert_eq!(snap.name, "before_eq");
        assert_eq!(snap.style.as_deref(), Some("techno"));
        assert_relative_eq!(snap.features.rms_mean, 0.1);
    }

    #[test]
    fn test_get_unknown_fails() {
        let (_dir, repo) = repo();
        let err = repo.get("nope").unwrap_err();
        assert!(matches!(err, MixmeterError::SnapshotNotFound { .. }));
    }

    #[test]
    fn test_save_overwrites_same_name() {
        let (_dir, repo) = repo();
        repo.save("mix", vector(0.1), None).unwrap();
        repo.save("mix", vector(0.3), None).unwrap();

        let snap = repo.get("mix").unwrap();
        assert_relative_eq!(snap.features.rms_mean, 0.3);
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_most_recent_first() {
        let (_dir, repo) = repo();
        repo.save("first", vector(0.1), None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        repo.save("second", vector(0.2), None).unwrap();

        assert_eq!(repo.list().unwrap(), vec!["second", "first"]);
    }

    #[test]
    fn test_delete() {
        let (_dir, repo) = repo();
        repo.save("gone", vector(0.1), None).unwrap();
        repo.delete("gone").unwrap();

        assert!(repo.list().unwrap().is_empty());
        let err = repo.delete("gone").unwrap_err();
        assert!(matches!(err, MixmeterError::SnapshotNotFound { .. }));
    }

    #[test]
    fn test_compare_reports_rms_delta() {
        let (_dir, repo) = repo();
        repo.save("mix-v1", vector(0.10), None).unwrap();
        repo.save("mix-v2", vector(0.12), None).unwrap();

        let cmp = repo.compare("mix-v1", "mix-v2").unwrap();
        let rms = &cmp.deltas["rms_mean"];
        assert_relative_eq!(rms.delta.unwrap(), 0.02, epsilon = 1e-12);
        assert_eq!(rms.direction, Some(Direction::Increased));
    }

    #[test]
    fn test_compare_is_directional_negation() {
        let (_dir, repo) = repo();
        let mut a = vector(0.1);
        a.brightness = 1500.0;
        let mut b = vector(0.25);
        b.brightness = 2400.0;
        repo.save("a", a, None).unwrap();
        repo.save("b", b, None).unwrap();

        let ab = repo.compare("a", "b").unwrap();
        let ba = repo.compare("b", "a").unwrap();
        for (metric, fwd) in &ab.deltas {
            let rev = &ba.deltas[metric];
            match (fwd.delta, rev.delta) {
                (Some(f), Some(r)) => assert_eq!(f, -r, "metric {}", metric),
                (None, None) => {}
                other => panic!("asymmetric delta presence for {}: {:?}", metric, other),
            }
        }
    }

    #[test]
    fn test_compare_union_covers_one_sided_metrics() {
        let (_dir, repo) = repo();
        let mut a = vector(0.1);
        a.frequency_band_energy.remove("brilliance");
        a.mfcc = vec![1.0];
        let b = vector(0.1);
        repo.save("a", a, None).unwrap();
        repo.save("b", b, None).unwrap();

        let cmp = repo.compare("a", "b").unwrap();
        let brilliance = &cmp.deltas["brilliance"];
        assert!(brilliance.before.is_none());
        assert!(brilliance.after.is_some());
        assert!(brilliance.delta.is_none());

        let tail = &cmp.deltas["mfcc[2]"];
        assert!(tail.before.is_none());
        assert!(tail.after.is_some());
    }

    #[test]
    fn test_compare_missing_snapshot_fails() {
        let (_dir, repo) = repo();
        repo.save("only", vector(0.1), None).unwrap();
        let err = repo.compare("only", "missing").unwrap_err();
        assert!(matches!(err, MixmeterError::SnapshotNotFound { .. }));
    }

    #[test]
    fn test_manifest_survives_reopen() {
        let (dir, repo) = repo();
        repo.save("persist", vector(0.1), Some("jazz")).unwrap();
        drop(repo);

        let reopened = SnapshotRepository::new(dir.path().join("snapshots"));
        let snap = reopened.get("persist").unwrap();
        assert_eq!(snap.style.as_deref(), Some("jazz"));
    }

    #[test]
    fn test_magnitude_classification() {
        let (direction, magnitude) = classify(0.10, 0.12);
        assert_eq!(direction, Direction::Increased);
        assert_eq!(magnitude, DeltaMagnitude::Moderate);

        let (_, magnitude) = classify(1000.0, 1001.0);
        assert_eq!(magnitude, DeltaMagnitude::Unchanged);

        let (direction, magnitude) = classify(0.5, 0.1);
        assert_eq!(direction, Direction::Decreased);
        assert_eq!(magnitude, DeltaMagnitude::Large);
    }
}
