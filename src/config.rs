// src/config.rs
//! Viewer configuration stored as JSON in the user's config directory

use crate::error::{MapError, Result};
use crate::view::lod::LodPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub data_dir: PathBuf,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub zoom_step: f64, // multiplier per wheel notch / key press
    pub pan_step: f64,  // pixels per key press
    pub lod: LodPolicy,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            viewport_width: 1024.0,
            viewport_height: 768.0,
            zoom_step: 1.25,
            pan_step: 64.0,
            lod: LodPolicy::default(),
        }
    }
}

impl ViewerConfig {
    /// Load configuration from the config file, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .map_err(|e| MapError::Other(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| MapError::Other(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the config file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MapError::Other(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| MapError::Other(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)
            .map_err(|e| MapError::Other(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| MapError::Other("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("tilemap-viewer")
            .join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.viewport_width > 0.0 && self.viewport_height > 0.0) {
            return Err(MapError::InvalidGeometry(format!(
                "viewport must be positive, got {}x{}",
                self.viewport_width, self.viewport_height
            )));
        }
        if !(self.zoom_step > 1.0) {
            return Err(MapError::InvalidGeometry(format!(
                "zoom step must be greater than 1, got {}",
                self.zoom_step
            )));
        }
        if !(self.pan_step > 0.0) {
            return Err(MapError::InvalidGeometry(format!(
                "pan step must be positive, got {}",
                self.pan_step
            )));
        }
        self.lod.validate()
    }

    /// Directory holding one map's data file and tile images
    pub fn map_dir(&self, map_name: &str) -> PathBuf {
        self.data_dir.join(map_name)
    }
}
