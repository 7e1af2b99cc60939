//! Built-in style profiles.
//!
//! The built-in set is compiled into the binary and parsed once at store
//! construction. These profiles are immutable at runtime; user profiles
//! shadow them by name without deleting them.

use std::collections::BTreeMap;

use super::{Origin, StyleProfile};

const BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("ambient", include_str!("../../styles/ambient.json")),
    ("downtempo", include_str!("../../styles/downtempo.json")),
    ("drum-and-bass", include_str!("../../styles/drum-and-bass.json")),
    ("edm", include_str!("../../styles/edm.json")),
    ("folk", include_str!("../../styles/folk.json")),
    ("hip-hop", include_str!("../../styles/hip-hop.json")),
    ("house", include_str!("../../styles/house.json")),
    ("industrial", include_str!("../../styles/industrial.json")),
    ("jazz", include_str!("../../styles/jazz.json")),
    ("lo-fi", include_str!("../../styles/lo-fi.json")),
    ("orchestral", include_str!("../../styles/orchestral.json")),
    ("rnb", include_str!("../../styles/rnb.json")),
    ("rock", include_str!("../../styles/rock.json")),
    ("synthpop", include_str!("../../styles/synthpop.json")),
    ("techno", include_str!("../../styles/techno.json")),
    ("vaporwave", include_str!("../../styles/vaporwave.json")),
];

/// Parse the embedded built-in profiles.
///
/// Panics only if a compiled-in resource is malformed, which is a packaging
/// defect rather than a runtime condition; the test below keeps it honest.
pub fn load_builtins() -> BTreeMap<String, StyleProfile> {
    let mut map = BTreeMap::new();
    for (name, source) in BUILTIN_SOURCES {
        let mut profile: StyleProfile = serde_json::from_str(source)
            .unwrap_or_else(|e| panic!("built-in style '{}' is malformed: {}", name, e));
        profile.origin = Origin::Builtin;
        profile
            .validate()
            .unwrap_or_else(|e| panic!("built-in style '{}' failed validation: {}", name, e));
        map.insert(profile.name.clone(), profile);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Band;

    #[test]
    fn test_all_builtins_parse_and_validate() {
        let builtins = load_builtins();
        assert_eq!(builtins.len(), 16);
        for (name, profile) in &builtins {
            assert_eq!(name, &profile.name);
            assert_eq!(profile.origin, Origin::Builtin);
            // Every shipped profile declares the full band set.
            for band in Band::ALL {
                assert!(
                    profile.ranges.frequency_balance.contains_key(band.as_str()),
                    "{} is missing band {}",
                    name,
                    band
                );
            }
        }
    }

    #[test]
    fn test_expected_styles_present() {
        let builtins = load_builtins();
        for name in [
            "ambient",
            "downtempo",
            "drum-and-bass",
            "edm",
            "folk",
            "hip-hop",
            "house",
            "industrial",
            "jazz",
            "lo-fi",
            "orchestral",
            "rnb",
            "rock",
            "synthpop",
            "techno",
            "vaporwave",
        ] {
            assert!(builtins.contains_key(name), "missing built-in: {}", name);
        }
    }

    #[test]
    fn test_lofi_brightness_target() {
        let builtins = load_builtins();
        let lofi = &builtins["lo-fi"];
        let brightness = lofi.ranges.brightness.unwrap();
        assert_eq!(brightness.low, 500.0);
        assert_eq!(brightness.high, 1800.0);
    }
}
