//! Runtime settings
//!
//! Persisted as JSON next to the binary. Missing or unreadable files fall
//! back to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{FRAME_INTERVAL_MS, MAX_STEP};

/// Settings file errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Who drives the frame update loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LoopDrive {
    /// Starting a run spawns the update loop
    #[default]
    Internal,
    /// The host calls `GameManager::update` itself
    External,
}

impl LoopDrive {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopDrive::Internal => "Internal",
            LoopDrive::External => "External",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "internal" => Some(LoopDrive::Internal),
            "external" | "host" => Some(LoopDrive::External),
            _ => None,
        }
    }
}

/// Game settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Stage file loaded at startup
    pub stage_path: PathBuf,
    /// Pause between two ticks of the update loop (milliseconds)
    pub frame_interval_ms: u64,
    /// Largest time step integrated by one tick (seconds)
    pub max_step: f64,
    pub drive: LoopDrive,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stage_path: PathBuf::from("stages/stage.txt"),
            frame_interval_ms: FRAME_INTERVAL_MS,
            max_step: MAX_STEP,
            drive: LoopDrive::Internal,
        }
    }
}

impl Settings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Clamp a measured time step into `[0, max_step]`
    pub fn clamp_step(&self, dt: f64) -> f64 {
        dt.max(0.0).min(self.max_step)
    }

    /// Read settings from `path`
    pub fn read(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load settings from `path`, using defaults if it is missing or invalid
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::read(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(SettingsError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(err) => {
                log::warn!("Ignoring {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gravity-runner-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.frame_interval(), Duration::from_millis(16));
        assert_eq!(settings.max_step, 0.03);
        assert_eq!(settings.drive, LoopDrive::Internal);
    }

    #[test]
    fn test_clamp_step() {
        let settings = Settings::default();
        assert_eq!(settings.clamp_step(0.5), 0.03);
        assert_eq!(settings.clamp_step(0.01), 0.01);
        assert_eq!(settings.clamp_step(-1.0), 0.0);
    }

    #[test]
    fn test_drive_from_str() {
        assert_eq!(LoopDrive::from_str("EXTERNAL"), Some(LoopDrive::External));
        assert_eq!(LoopDrive::from_str("internal"), Some(LoopDrive::Internal));
        assert_eq!(LoopDrive::from_str("sometimes"), None);
        assert_eq!(LoopDrive::External.as_str(), "External");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"drive": "External"}"#).unwrap();
        assert_eq!(settings.drive, LoopDrive::External);
        assert_eq!(settings.frame_interval_ms, FRAME_INTERVAL_MS);
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch("roundtrip.json");
        let settings = Settings {
            stage_path: PathBuf::from("levels/long.txt"),
            frame_interval_ms: 8,
            max_step: 0.02,
            drive: LoopDrive::External,
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_or_invalid_file_falls_back() {
        assert_eq!(Settings::load(scratch("missing.json")), Settings::default());

        let path = scratch("invalid.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::read(&path), Err(SettingsError::Json(_))));
        assert_eq!(Settings::load(&path), Settings::default());
        std::fs::remove_file(&path).unwrap();
    }
}
