//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command. Every command prints
//! its result as pretty JSON; errors propagate to main with their typed
//! error code intact.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::engine::{self, DetectorConfig, Role};
use crate::error::{MixmeterError, Result};
use crate::features::FeatureVector;
use crate::profile::{ProfileStore, RangeSet};
use crate::snapshot::SnapshotRepository;

/// Where user styles and snapshots live.
///
/// `$MIXMETER_DATA_DIR` wins, then `~/.mixmeter`, then `.mixmeter` in the
/// working directory for environments without a home.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MIXMETER_DATA_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(home) = std::env::var("HOME") {
        return Path::new(&home).join(".mixmeter");
    }
    PathBuf::from(".mixmeter")
}

pub fn profile_store(data_dir: &Path) -> ProfileStore {
    ProfileStore::new(data_dir.join("styles"))
}

pub fn snapshot_repo(data_dir: &Path) -> SnapshotRepository {
    SnapshotRepository::new(data_dir.join("snapshots"))
}

fn read_features(path: &Path) -> Result<FeatureVector> {
    let content = fs::read_to_string(path).map_err(|e| MixmeterError::FileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let features: FeatureVector =
        serde_json::from_str(&content).map_err(|e| MixmeterError::InvalidFeatures {
            reason: format!("{}: {}", path.display(), e),
        })?;
    features.validate()?;
    Ok(features)
}

fn read_ranges(path: &Path) -> Result<RangeSet> {
    let content = fs::read_to_string(path).map_err(|e| MixmeterError::FileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let ranges: RangeSet = serde_json::from_str(&content)?;
    Ok(ranges)
}

fn parse_role(role: &str) -> Result<Role> {
    match role {
        "bass" => Ok(Role::Bass),
        "lead" => Ok(Role::Lead),
        "pad" => Ok(Role::Pad),
        "percussion" => Ok(Role::Percussion),
        "texture" => Ok(Role::Texture),
        other => Err(MixmeterError::InvalidFeatures {
            reason: format!(
                "unknown role '{}' (expected bass, lead, pad, percussion, or texture)",
                other
            ),
        }),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Evaluate a feature vector against a style and print the full result.
pub fn evaluate(data_dir: &Path, style: &str, features_path: &Path) -> Result<()> {
    info!("evaluating {} against '{}'", features_path.display(), style);

    let store = profile_store(data_dir);
    let profile = store.resolve(style)?;
    let features = read_features(features_path)?;

    let result = engine::evaluate(&features, &profile, &DetectorConfig::default())?;
    print_json(&result)
}

/// Evaluate and print only the ranked suggestions.
pub fn suggest(data_dir: &Path, style: &str, features_path: &Path) -> Result<()> {
    info!("suggesting against '{}'", style);

    let store = profile_store(data_dir);
    let profile = store.resolve(style)?;
    let features = read_features(features_path)?;

    let result = engine::evaluate(&features, &profile, &DetectorConfig::default())?;

    #[derive(Serialize)]
    struct SuggestOutput {
        style: String,
        cohesion_score: f64,
        suggestions: Vec<engine::Suggestion>,
    }
    print_json(&SuggestOutput {
        style: result.style,
        cohesion_score: result.cohesion_score,
        suggestions: result.suggestions,
    })
}

/// Classify a track's role and judge its fit.
pub fn audition(
    data_dir: &Path,
    style: &str,
    features_path: &Path,
    role: Option<&str>,
) -> Result<()> {
    let store = profile_store(data_dir);
    let profile = store.resolve(style)?;
    let features = read_features(features_path)?;
    let role = role.map(parse_role).transpose()?;

    let result = engine::audition(&features, &profile, role)?;
    print_json(&result)
}

/// List all style profiles with their origin.
pub fn styles_list(data_dir: &Path) -> Result<()> {
    let store = profile_store(data_dir);
    let listed = store.list()?;

    #[derive(Serialize)]
    struct StyleEntry {
        name: String,
        origin: crate::profile::Origin,
    }
    let entries: Vec<StyleEntry> = listed
        .into_iter()
        .map(|(name, origin)| StyleEntry { name, origin })
        .collect();
    print_json(&entries)
}

/// Print a resolved style profile.
pub fn styles_show(data_dir: &Path, name: &str) -> Result<()> {
    let store = profile_store(data_dir);
    let profile = store.resolve(name)?;
    print_json(&profile)
}

/// Create a user style profile from a ranges file.
pub fn styles_create(
    data_dir: &Path,
    name: &str,
    description: &str,
    ranges_path: &Path,
) -> Result<()> {
    let store = profile_store(data_dir);
    let ranges = read_ranges(ranges_path)?;
    let profile = store.create(name, description, ranges)?;

    info!("created user style '{}'", name);
    print_json(&profile)
}

/// Merge partial ranges into a user style.
pub fn styles_update(
    data_dir: &Path,
    name: &str,
    description: Option<&str>,
    ranges_path: &Path,
) -> Result<()> {
    let store = profile_store(data_dir);
    let ranges = read_ranges(ranges_path)?;
    let profile = store.update(name, ranges, description)?;

    info!("updated user style '{}'", name);
    print_json(&profile)
}

/// Delete a user style profile.
pub fn styles_delete(data_dir: &Path, name: &str) -> Result<()> {
    let store = profile_store(data_dir);
    store.delete(name)?;
    println!("Deleted style: {}", name);
    Ok(())
}

/// Save a feature vector as a named snapshot.
pub fn snapshot_save(
    data_dir: &Path,
    name: &str,
    features_path: &Path,
    style: Option<&str>,
) -> Result<()> {
    let repo = snapshot_repo(data_dir);
    let features = read_features(features_path)?;
    let snapshot = repo.save(name, features, style)?;

    info!("saved snapshot '{}'", name);
    print_json(&snapshot)
}

/// Print a saved snapshot.
pub fn snapshot_show(data_dir: &Path, name: &str) -> Result<()> {
    let repo = snapshot_repo(data_dir);
    let snapshot = repo.get(name)?;
    print_json(&snapshot)
}

/// List snapshot names, most recent first.
pub fn snapshot_list(data_dir: &Path) -> Result<()> {
    let repo = snapshot_repo(data_dir);
    let names = repo.list()?;
    print_json(&names)
}

/// Delete a snapshot.
pub fn snapshot_delete(data_dir: &Path, name: &str) -> Result<()> {
    let repo = snapshot_repo(data_dir);
    repo.delete(name)?;
    println!("Deleted snapshot: {}", name);
    Ok(())
}

/// Print per-metric deltas from snapshot A to snapshot B.
pub fn snapshot_compare(data_dir: &Path, a: &str, b: &str) -> Result<()> {
    let repo = snapshot_repo(data_dir);
    let comparison = repo.compare(a, b)?;
    print_json(&comparison)
}
