use std::fs;
use std::path::Path;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::core::error::DetectorError;
use crate::detection::color::{ColorRange, Hsv, ObjectClass};

type HsvTriple = [u8; 3];

/// The three calibrated HSV ranges, persisted as a flat JSON document with
/// `<class>_color_lower` / `<class>_color_upper` keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSettings {
    #[serde(default = "default_player_lower")]
    pub player_color_lower: HsvTriple,
    #[serde(default = "default_player_upper")]
    pub player_color_upper: HsvTriple,

    #[serde(default = "default_target_lower")]
    pub target_color_lower: HsvTriple,
    #[serde(default = "default_target_upper")]
    pub target_color_upper: HsvTriple,

    #[serde(default = "default_trap_lower")]
    pub trap_color_lower: HsvTriple,
    #[serde(default = "default_trap_upper")]
    pub trap_color_upper: HsvTriple,
}

// Built-in defaults: violet player, green target, red trap.
fn default_player_lower() -> HsvTriple {
    [140, 50, 50]
}
fn default_player_upper() -> HsvTriple {
    [170, 255, 255]
}
fn default_target_lower() -> HsvTriple {
    [40, 50, 50]
}
fn default_target_upper() -> HsvTriple {
    [80, 255, 255]
}
fn default_trap_lower() -> HsvTriple {
    [0, 50, 50]
}
fn default_trap_upper() -> HsvTriple {
    [10, 255, 255]
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            player_color_lower: default_player_lower(),
            player_color_upper: default_player_upper(),
            target_color_lower: default_target_lower(),
            target_color_upper: default_target_upper(),
            trap_color_lower: default_trap_lower(),
            trap_color_upper: default_trap_upper(),
        }
    }
}

impl ColorSettings {
    pub const DEFAULT_FILE: &'static str = "color_config.json";

    /// Load settings from a file. A missing or malformed file is never fatal:
    /// it is logged and the built-in defaults are used instead.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<ColorSettings>(&contents) {
                Ok(mut settings) => {
                    settings.sanitize();
                    info!("configuration loaded from {}", path.display());
                    settings
                }
                Err(e) => {
                    error!("malformed configuration {}: {e}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("configuration {} not found; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                error!("failed to read configuration {}: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Save settings as pretty-printed JSON. Failure is reported to the
    /// caller but must not stop the loop.
    pub fn save(&self, path: &Path) -> Result<(), DetectorError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| DetectorError::ConfigSave {
            path: path.to_path_buf(),
            source,
        })?;
        info!("configuration saved to {}", path.display());
        Ok(())
    }

    pub fn range(&self, class: ObjectClass) -> ColorRange {
        let (lower, upper) = match class {
            ObjectClass::Player => (self.player_color_lower, self.player_color_upper),
            ObjectClass::Target => (self.target_color_lower, self.target_color_upper),
            ObjectClass::Trap => (self.trap_color_lower, self.trap_color_upper),
        };
        ColorRange::new(Hsv::from(lower), Hsv::from(upper))
    }

    pub fn set_range(&mut self, class: ObjectClass, range: ColorRange) {
        let (lower, upper) = match class {
            ObjectClass::Player => (&mut self.player_color_lower, &mut self.player_color_upper),
            ObjectClass::Target => (&mut self.target_color_lower, &mut self.target_color_upper),
            ObjectClass::Trap => (&mut self.trap_color_lower, &mut self.trap_color_upper),
        };
        *lower = range.lower.into();
        *upper = range.upper.into();
    }

    /// Reset any range violating the lower<=upper / hue<=179 invariants to
    /// that class's built-in default.
    fn sanitize(&mut self) {
        let defaults = Self::default();
        for class in ObjectClass::ALL {
            if !self.range(class).is_valid() {
                warn!(
                    "{class} color range {} is invalid; resetting to default",
                    self.range(class)
                );
                self.set_range(class, defaults.range(class));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("gamedetector-{}-{}.json", name, std::process::id()));
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = ColorSettings::load(Path::new("does-not-exist.json"));
        assert_eq!(settings, ColorSettings::default());
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let path = temp_path("malformed");
        fs::write(&path, "{ not json").unwrap();
        let settings = ColorSettings::load(&path);
        assert_eq!(settings, ColorSettings::default());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn round_trip_is_bit_identical() {
        let path = temp_path("roundtrip");
        let mut settings = ColorSettings::default();
        settings.player_color_lower = [141, 52, 53];
        settings.player_color_upper = [169, 254, 253];
        settings.save(&path).unwrap();

        let loaded = ColorSettings::load(&path);
        assert_eq!(loaded, settings);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = temp_path("partial");
        fs::write(&path, r#"{"trap_color_lower": [5, 60, 60], "trap_color_upper": [15, 255, 255]}"#)
            .unwrap();
        let settings = ColorSettings::load(&path);
        assert_eq!(settings.trap_color_lower, [5, 60, 60]);
        assert_eq!(settings.player_color_lower, default_player_lower());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn invalid_range_resets_to_class_default() {
        let path = temp_path("invalid-range");
        // Lower hue above upper hue violates the range invariant.
        fs::write(
            &path,
            r#"{"target_color_lower": [90, 50, 50], "target_color_upper": [60, 255, 255]}"#,
        )
        .unwrap();
        let settings = ColorSettings::load(&path);
        assert_eq!(settings.target_color_lower, default_target_lower());
        assert_eq!(settings.target_color_upper, default_target_upper());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn flat_json_keys_are_preserved() {
        let json = serde_json::to_string(&ColorSettings::default()).unwrap();
        for key in [
            "player_color_lower",
            "player_color_upper",
            "target_color_lower",
            "target_color_upper",
            "trap_color_lower",
            "trap_color_upper",
        ] {
            assert!(json.contains(key), "missing key {key}");
        }
    }
}
