//! Converter configuration (obj8.toml)
//!
//! Every field has a default, so an empty or missing file is valid.

use anyhow::{Context, Result};
use obj8_common::Precision;
use serde::Deserialize;
use std::path::Path;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub export: ExportConfig,
    pub import: ImportConfig,
}

/// Export tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Decimals kept for positions and translations
    pub position_precision: u32,
    /// Decimals kept for normals
    pub normal_precision: u32,
    /// Decimals kept for texture coordinates
    pub uv_precision: u32,
    /// Decimals kept for rotation angles (degrees)
    pub angle_precision: u32,
    /// How close |sin(y)| must be to 1 to count as gimbal lock
    pub gimbal_tolerance: f64,
    /// Resolve gimbal lock by keeping the previous frame's Z angle instead
    /// of sampling a midpoint
    pub force_gimbal: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            position_precision: 4,
            normal_precision: 3,
            uv_precision: 4,
            angle_precision: 2,
            gimbal_tolerance: 1e-6,
            force_gimbal: false,
        }
    }
}

impl ExportConfig {
    pub fn precision(&self) -> Precision {
        Precision {
            position: self.position_precision,
            normal: self.normal_precision,
            uv: self.uv_precision,
        }
    }
}

/// Import tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Edges between faces closer than this (degrees) are smoothed
    pub smooth_angle: f64,
    /// Edges between faces closer than this (radians) are coplanar
    pub planar_angle: f64,
    /// Offset applied to coincident texture coordinates
    pub uv_nudge: f64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            smooth_angle: 35.0,
            planar_angle: 0.00002,
            uv_nudge: 1.0 / 1024.0,
        }
    }
}

/// Load a config file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {:?}", path))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {:?}", path))?;
    Ok(config)
}

/// Load `path` if given, otherwise fall back to defaults
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}
