//! Player settings and the persisted profile
//!
//! A [`Profile`] bundles [`Settings`] and [`Statistics`]. It is loaded from a data
//! directory, handed to whoever needs it, and saved back explicitly.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stats::Statistics;

/// File name of the settings inside a data directory
pub const SETTINGS_FILE: &str = "settings.json";

/// File name of the statistics inside a data directory
pub const STATS_FILE: &str = "stats.json";

/// Audio settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Music volume, 0.0..=1.0
    pub music_volume: f32,
    /// Sound effect volume, 0.0..=1.0
    pub sfx_volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            music_volume: 0.5,
            sfx_volume: 0.5,
        }
    }
}

impl Settings {
    pub fn with_music_volume(mut self, volume: f32) -> Self {
        self.music_volume = clamp_volume(volume);
        self
    }

    pub fn with_sfx_volume(mut self, volume: f32) -> Self {
        self.sfx_volume = clamp_volume(volume);
        self
    }

    /// Clamp both volumes into range
    fn sanitized(self) -> Self {
        Self {
            music_volume: clamp_volume(self.music_volume),
            sfx_volume: clamp_volume(self.sfx_volume),
        }
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.5
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Settings and statistics of one player
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub settings: Settings,
    pub statistics: Statistics,
}

impl Profile {
    /// Load from a data directory; missing files yield defaults
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let settings: Settings = load_json(&dir.join(SETTINGS_FILE))?;
        let statistics = load_json(&dir.join(STATS_FILE))?;
        Ok(Self {
            settings: settings.sanitized(),
            statistics,
        })
    }

    /// Save into a data directory, creating it if needed
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        save_json(&dir.join(SETTINGS_FILE), &self.settings)?;
        save_json(&dir.join(STATS_FILE), &self.statistics)?;
        Ok(())
    }

    /// Paths of the files making up a profile
    pub fn files(dir: impl AsRef<Path>) -> [PathBuf; 2] {
        let dir = dir.as_ref();
        [dir.join(SETTINGS_FILE), dir.join(STATS_FILE)]
    }
}

fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let value = serde_json::from_str(&text)?;
            tracing::info!("Loaded {}", path.display());
            Ok(value)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No file at {}, using defaults", path.display());
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text)?;
    tracing::info!("Saved {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameSummary;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tetrecs-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.music_volume, 0.5);
        assert_eq!(settings.sfx_volume, 0.5);
    }

    #[test]
    fn test_volume_clamped() {
        let settings = Settings::default()
            .with_music_volume(1.7)
            .with_sfx_volume(-0.2);
        assert_eq!(settings.music_volume, 1.0);
        assert_eq!(settings.sfx_volume, 0.0);
    }

    #[test]
    fn test_missing_key_uses_default() {
        let settings: Settings = serde_json::from_str(r#"{"sfx_volume": 0.25}"#).unwrap();
        assert_eq!(settings.music_volume, 0.5);
        assert_eq!(settings.sfx_volume, 0.25);
    }

    #[test]
    fn test_load_missing_dir() {
        let profile = Profile::load(temp_dir("missing")).unwrap();
        assert_eq!(profile, Profile::default());
    }

    #[test]
    fn test_profile_round_trip() {
        let dir = temp_dir("profile");
        let mut profile = Profile::default();
        profile.settings = profile.settings.with_music_volume(0.8);
        profile.statistics.record_game(&GameSummary {
            score: 450,
            level: 0,
            lines_cleared: 3,
            highest_multiplier: 2,
        });
        profile.save(&dir).unwrap();

        for file in Profile::files(&dir) {
            assert!(file.exists());
        }
        assert_eq!(Profile::load(&dir).unwrap(), profile);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_clamps_out_of_range() {
        let dir = temp_dir("clamp");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(SETTINGS_FILE), r#"{"music_volume": 3.0}"#).unwrap();
        let profile = Profile::load(&dir).unwrap();
        assert_eq!(profile.settings.music_volume, 1.0);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
