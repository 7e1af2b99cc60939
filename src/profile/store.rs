//! Layered style-profile store.
//!
//! Two layers, override checked first: a user-writable directory of
//! `<name>.json` files over the embedded built-in set. User files are read
//! lazily at resolution time (never cached across calls) so edits made
//! outside the process are visible immediately. Writes go to a temp file in
//! the same directory and are renamed into place, so a concurrent reader
//! observes either the pre- or post-mutation file, never a partial write.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use log::{debug, warn};
use walkdir::WalkDir;

use crate::error::{MixmeterError, Result};
use crate::profile::{builtin, Origin, RangeSet, StyleProfile};

/// Resolves style profiles by name across the built-in and user layers.
pub struct ProfileStore {
    builtins: BTreeMap<String, StyleProfile>,
    user_dir: PathBuf,
    lock: RwLock<()>,
}

impl ProfileStore {
    /// Create a store over a user styles directory.
    ///
    /// The directory is created on first write, not here.
    pub fn new(user_dir: impl Into<PathBuf>) -> Self {
        Self {
            builtins: builtin::load_builtins(),
            user_dir: user_dir.into(),
            lock: RwLock::new(()),
        }
    }

    /// The user styles directory backing this store.
    pub fn user_dir(&self) -> &Path {
        &self.user_dir
    }

    fn user_path(&self, name: &str) -> PathBuf {
        self.user_dir.join(format!("{}.json", name))
    }

    /// Profile names must be usable as file names in the user directory.
    fn validate_name(name: &str) -> Result<()> {
        let bad = name.trim().is_empty()
            || name.starts_with('.')
            || name.contains('/')
            || name.contains('\\');
        if bad {
            return Err(MixmeterError::InvalidProfile {
                name: name.to_string(),
                reason: "name must be non-empty and contain no path separators".to_string(),
            });
        }
        Ok(())
    }

    /// Read and validate a user profile file, if one exists.
    fn load_user(&self, name: &str) -> Result<Option<StyleProfile>> {
        let path = self.user_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| MixmeterError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let mut profile: StyleProfile =
            serde_json::from_str(&content).map_err(|e| MixmeterError::InvalidProfile {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        profile.origin = Origin::User;
        profile.validate()?;
        Ok(Some(profile))
    }

    fn write_user(&self, profile: &StyleProfile) -> Result<()> {
        if !self.user_dir.exists() {
            fs::create_dir_all(&self.user_dir).map_err(|e| MixmeterError::DirectoryCreateError {
                path: self.user_dir.clone(),
                source: e,
            })?;
        }

        let path = self.user_path(&profile.name);
        let tmp_path = self.user_dir.join(format!("{}.json.tmp", profile.name));
        let content = serde_json::to_string_pretty(profile)?;

        fs::write(&tmp_path, content).map_err(|e| MixmeterError::FileWriteError {
            path: tmp_path.clone(),
            source: e,
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| MixmeterError::FileWriteError {
            path: path.clone(),
            source: e,
        })?;

        debug!("wrote user style '{}' to {}", profile.name, path.display());
        Ok(())
    }

    /// Resolve a profile by name.
    ///
    /// When both layers have the name, the user override's ranges win per
    /// metric and unspecified metrics fall back to the built-in's values.
    pub fn resolve(&self, name: &str) -> Result<StyleProfile> {
        let _guard = self.lock.read().expect("profile store lock poisoned");

        let user = self.load_user(name)?;
        let builtin = self.builtins.get(name);

        match (user, builtin) {
            (Some(user), Some(builtin)) => Ok(user.merged_over(builtin)),
            (Some(user), None) => Ok(user),
            (None, Some(builtin)) => Ok(builtin.clone()),
            (None, None) => Err(MixmeterError::StyleNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// All known profile names with their effective origin, sorted by name.
    ///
    /// A name present in the user layer reports [`Origin::User`] since that
    /// layer shadows the built-in. Malformed user files are skipped with a
    /// warning so the rest of the store stays usable.
    pub fn list(&self) -> Result<Vec<(String, Origin)>> {
        let _guard = self.lock.read().expect("profile store lock poisoned");

        let mut names: BTreeMap<String, Origin> = self
            .builtins
            .keys()
            .map(|name| (name.clone(), Origin::Builtin))
            .collect();

        if self.user_dir.exists() {
            for entry in WalkDir::new(&self.user_dir)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                match self.load_user(stem) {
                    Ok(Some(_)) => {
                        names.insert(stem.to_string(), Origin::User);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("skipping malformed user style {}: {}", path.display(), e);
                    }
                }
            }
        }

        Ok(names.into_iter().collect())
    }

    /// True when a user profile file exists for this name.
    pub fn is_user_style(&self, name: &str) -> bool {
        self.user_path(name).exists()
    }

    /// Create a new user profile.
    ///
    /// Fails with `Conflict` if a user profile of that name exists. A name
    /// matching a built-in is allowed; the new profile shadows it.
    pub fn create(&self, name: &str, description: &str, ranges: RangeSet) -> Result<StyleProfile> {
        let _guard = self.lock.write().expect("profile store lock poisoned");

        Self::validate_name(name)?;
        if self.user_path(name).exists() {
            return Err(MixmeterError::StyleConflict {
                name: name.to_string(),
            });
        }

        let profile = StyleProfile::new(name, description, ranges);
        profile.validate()?;
        self.write_user(&profile)?;
        Ok(profile)
    }

    /// Merge partial ranges into the user profile for `name`.
    ///
    /// If no user profile exists but a built-in does, this writes a fresh
    /// override carrying just the supplied ranges (the rest of the shape
    /// keeps falling back to the built-in at resolution time). Unknown
    /// names fail with `NotFound`.
    pub fn update(
        &self,
        name: &str,
        ranges: RangeSet,
        description: Option<&str>,
    ) -> Result<StyleProfile> {
        let _guard = self.lock.write().expect("profile store lock poisoned");

        Self::validate_name(name)?;

        let profile = match self.load_user(name)? {
            Some(existing) => StyleProfile::new(
                name,
                description.unwrap_or(&existing.description),
                ranges.merged_over(&existing.ranges),
            ),
            None => {
                if !self.builtins.contains_key(name) {
                    return Err(MixmeterError::StyleNotFound {
                        name: name.to_string(),
                    });
                }
                StyleProfile::new(name, description.unwrap_or(""), ranges)
            }
        };

        profile.validate()?;
        self.write_user(&profile)?;
        Ok(profile)
    }

    /// Delete the user profile for `name`.
    ///
    /// Deleting an override reverts resolution to the built-in. A built-in
    /// with no override is protected; unknown names fail with `NotFound`.
    pub fn delete(&self, name: &str) -> Result<()> {
        let _guard = self.lock.write().expect("profile store lock poisoned");

        let path = self.user_path(name);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| MixmeterError::FileWriteError {
                path: path.clone(),
                source: e,
            })?;
            debug!("deleted user style '{}'", name);
            return Ok(());
        }

        if self.builtins.contains_key(name) {
            return Err(MixmeterError::BuiltinProtected {
                name: name.to_string(),
            });
        }
        Err(MixmeterError::StyleNotFound {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MixmeterError;
    use crate::features::{Band, MetricId};
    use crate::profile::Range;
    use tempfile::TempDir;

    fn store() -> (TempDir, ProfileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("styles"));
        (dir, store)
    }

    fn bass_ranges(low: f64, high: f64) -> RangeSet {
        let mut ranges = RangeSet::default();
        ranges
            .frequency_balance
            .insert("bass".to_string(), Range::new(low, high));
        ranges
    }

    #[test]
    fn test_resolve_builtin() {
        let (_dir, store) = store();
        let profile = store.resolve("ambient").unwrap();
        assert_eq!(profile.name, "ambient");
        assert_eq!(profile.origin, Origin::Builtin);
        assert!(profile.ranges.dynamic_range_db.is_some());
    }

    #[test]
    fn test_resolve_unknown_fails() {
        let (_dir, store) = store();
        let err = store.resolve("shoegaze").unwrap_err();
        assert!(matches!(err, MixmeterError::StyleNotFound { .. }));
    }

    #[test]
    fn test_create_and_resolve_user_style() {
        let (_dir, store) = store();
        store
            .create("my-custom", "A test custom style", bass_ranges(0.01, 0.1))
            .unwrap();

        let profile = store.resolve("my-custom").unwrap();
        assert_eq!(profile.origin, Origin::User);
        assert_eq!(profile.description, "A test custom style");
        assert_eq!(
            profile.range_for(MetricId::Band(Band::Bass)),
            Some(Range::new(0.01, 0.1))
        );
    }

    #[test]
    fn test_create_conflict_on_existing_user_style() {
        let (_dir, store) = store();
        store.create("dupe", "", bass_ranges(0.0, 0.5)).unwrap();
        let err = store.create("dupe", "", bass_ranges(0.0, 0.5)).unwrap_err();
        assert!(matches!(err, MixmeterError::StyleConflict { .. }));
    }

    #[test]
    fn test_override_merges_with_builtin() {
        let (_dir, store) = store();
        store
            .create("ambient", "My custom ambient", bass_ranges(0.5, 0.9))
            .unwrap();

        let merged = store.resolve("ambient").unwrap();
        assert_eq!(merged.description, "My custom ambient");
        assert_eq!(
            merged.range_for(MetricId::Band(Band::Bass)),
            Some(Range::new(0.5, 0.9))
        );
        // Metrics the override does not mention keep the built-in shape.
        assert!(merged.range_for(MetricId::Brightness).is_some());
        assert!(merged.range_for(MetricId::Band(Band::Mid)).is_some());
    }

    #[test]
    fn test_update_merges_into_existing_user_style() {
        let (_dir, store) = store();
        store
            .create("custom", "original", bass_ranges(0.1, 0.2))
            .unwrap();

        let mut update = RangeSet::default();
        update.stereo_width = Some(Range::new(0.2, 0.6));
        store.update("custom", update, None).unwrap();

        let profile = store.resolve("custom").unwrap();
        assert_eq!(profile.description, "original");
        assert_eq!(
            profile.range_for(MetricId::Band(Band::Bass)),
            Some(Range::new(0.1, 0.2))
        );
        assert_eq!(
            profile.range_for(MetricId::StereoWidth),
            Some(Range::new(0.2, 0.6))
        );
    }

    #[test]
    fn test_update_builtin_creates_override() {
        let (_dir, store) = store();
        assert!(!store.is_user_style("techno"));

        store.update("techno", bass_ranges(0.3, 0.5), None).unwrap();
        assert!(store.is_user_style("techno"));

        let profile = store.resolve("techno").unwrap();
        assert_eq!(
            profile.range_for(MetricId::Band(Band::Bass)),
            Some(Range::new(0.3, 0.5))
        );
        // Description falls back to the built-in's.
        assert!(!profile.description.is_empty());
    }

    #[test]
    fn test_update_unknown_name_fails() {
        let (_dir, store) = store();
        let err = store
            .update("no-such-style", bass_ranges(0.0, 1.0), None)
            .unwrap_err();
        assert!(matches!(err, MixmeterError::StyleNotFound { .. }));
    }

    #[test]
    fn test_delete_builtin_forbidden_until_overridden() {
        let (_dir, store) = store();

        let err = store.delete("jazz").unwrap_err();
        assert!(matches!(err, MixmeterError::BuiltinProtected { .. }));

        // After creating an override, delete removes the override and
        // resolution reverts to the built-in values.
        store
            .create("jazz", "louder jazz", bass_ranges(0.4, 0.6))
            .unwrap();
        store.delete("jazz").unwrap();

        let profile = store.resolve("jazz").unwrap();
        assert_eq!(profile.origin, Origin::Builtin);
        assert_ne!(
            profile.range_for(MetricId::Band(Band::Bass)),
            Some(Range::new(0.4, 0.6))
        );
    }

    #[test]
    fn test_delete_unknown_fails() {
        let (_dir, store) = store();
        let err = store.delete("no-such-style").unwrap_err();
        assert!(matches!(err, MixmeterError::StyleNotFound { .. }));
    }

    #[test]
    fn test_list_reports_effective_origin() {
        let (_dir, store) = store();
        store.create("my-custom", "", bass_ranges(0.0, 0.5)).unwrap();
        store.create("ambient", "", bass_ranges(0.0, 0.5)).unwrap();

        let listed = store.list().unwrap();
        let find = |name: &str| listed.iter().find(|(n, _)| n == name).map(|(_, o)| *o);

        assert_eq!(find("my-custom"), Some(Origin::User));
        assert_eq!(find("ambient"), Some(Origin::User));
        assert_eq!(find("techno"), Some(Origin::Builtin));

        // Sorted by name.
        let names: Vec<_> = listed.iter().map(|(n, _)| n.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_list_skips_malformed_files() {
        let (_dir, store) = store();
        store.create("good", "", bass_ranges(0.0, 0.5)).unwrap();
        fs::write(store.user_dir().join("broken.json"), "{ not json").unwrap();

        let listed = store.list().unwrap();
        assert!(listed.iter().any(|(n, _)| n == "good"));
        assert!(!listed.iter().any(|(n, _)| n == "broken"));
    }

    #[test]
    fn test_resolve_malformed_user_file_is_typed_error() {
        let (_dir, store) = store();
        fs::create_dir_all(store.user_dir()).unwrap();
        fs::write(store.user_dir().join("bad.json"), "{ not json").unwrap();

        let err = store.resolve("bad").unwrap_err();
        assert!(matches!(err, MixmeterError::InvalidProfile { .. }));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let (_dir, store) = store();
        for name in ["", "  ", "../escape", "a/b", ".hidden"] {
            let err = store.create(name, "", RangeSet::default()).unwrap_err();
            assert!(
                matches!(err, MixmeterError::InvalidProfile { .. }),
                "name {:?} should be rejected",
                name
            );
        }
    }
}
