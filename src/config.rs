//! The optional `dataset_config.json` sidecar.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::normalize::ResizeMode;

/// Raw sidecar contents. Keys other than `resize_mode` (console type, emulator
/// settings, ...) are ignored.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct DatasetConfig {
    #[serde(default)]
    pub resize_mode: Option<String>,
}

impl DatasetConfig {
    /// Parse a sidecar from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Load the sidecar at `path`.
    ///
    /// A missing file yields the default config. An unreadable or malformed
    /// file is logged and also yields the default; it never fails the run.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let parsed = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| Self::from_json(&text).map_err(|e| e.to_string()));

        match parsed {
            Ok(config) => {
                info!(
                    "Loaded config {}: resize_mode={:?}",
                    path.display(),
                    config.resize_mode.as_deref().unwrap_or("pad")
                );
                config
            }
            Err(e) => {
                warn!(
                    "Failed to read config file {}: {e}. Defaulting to 'pad'.",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// The mode every frame is normalized with. Unrecognized names resolve to
    /// `pad`.
    pub fn resize_mode(&self) -> ResizeMode {
        match self.resize_mode.as_deref() {
            None => ResizeMode::default(),
            Some(name) => {
                let mode = ResizeMode::resolve(name);
                if ResizeMode::parse(name).is_none() {
                    warn!("Unknown resize_mode '{name}', using '{mode}'");
                }
                mode
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pad() {
        assert_eq!(DatasetConfig::default().resize_mode(), ResizeMode::Pad);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config =
            DatasetConfig::from_json(r#"{"resize_mode": "crop", "console_type": "NES"}"#).unwrap();
        assert_eq!(config.resize_mode(), ResizeMode::Crop);
    }

    #[test]
    fn test_missing_key_is_pad() {
        let config = DatasetConfig::from_json(r#"{"console_type": "SNES"}"#).unwrap();
        assert_eq!(config.resize_mode(), ResizeMode::Pad);
    }

    #[test]
    fn test_unknown_mode_is_pad() {
        let config = DatasetConfig::from_json(r#"{"resize_mode": "zoom"}"#).unwrap();
        assert_eq!(config.resize_mode(), ResizeMode::Pad);
    }

    #[test]
    fn test_load_absent_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatasetConfig::load(&dir.path().join("dataset_config.json"));
        assert_eq!(config, DatasetConfig::default());
    }

    #[test]
    fn test_load_malformed_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset_config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(DatasetConfig::load(&path).resize_mode(), ResizeMode::Pad);

        // Wrong type for a known key is malformed too.
        fs::write(&path, r#"{"resize_mode": 3}"#).unwrap();
        assert_eq!(DatasetConfig::load(&path).resize_mode(), ResizeMode::Pad);
    }

    #[test]
    fn test_load_stretch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset_config.json");
        fs::write(&path, r#"{"resize_mode": "stretch"}"#).unwrap();
        assert_eq!(DatasetConfig::load(&path).resize_mode(), ResizeMode::Stretch);
    }
}
