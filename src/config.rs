// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application configuration.
//!
//! All tunable literals of the overlay (hit radii, ring dimensions, the
//! taper width and the default line-of-scrimmage position) live in
//! [`OverlayConfig`]. The whole [`AppConfig`] can be read from a YAML or
//! JSON file and selectively overridden from the command line.

use crate::error::{OverlayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// RGBA color as stored in config files.
pub type Rgba = [u8; 4];

/// Visual and interaction constants of the field overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Radius within which a pointer press grabs a bound point.
    pub hit_radius: f64,
    /// Radius within which a bound point is highlighted on hover.
    pub hover_radius: f64,
    /// Outer radius of a bound point ring.
    pub ring_radius: f32,
    /// Stroke width of a bound point ring; the center is left clear.
    pub ring_width: f32,
    /// Radius of the extra ring drawn around the hovered point.
    pub highlight_radius: f32,
    pub highlight_width: f32,
    /// Width of the line-of-scrimmage band at the near edge.
    pub los_near_width: f64,
    /// Line-of-scrimmage position used when an experiment has none saved.
    pub default_los_position: f64,
    pub player_stroke_width: f32,
    /// Label placement relative to the point, in frame pixels.
    pub label_offset: [f64; 2],
    pub top_color: Rgba,
    pub bottom_color: Rgba,
    pub highlight_color: Rgba,
    pub los_color: Rgba,
    pub player_color: Rgba,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            hit_radius: 50.0,
            hover_radius: 50.0,
            ring_radius: 10.0,
            ring_width: 3.0,
            highlight_radius: 15.0,
            highlight_width: 3.0,
            los_near_width: 11.0,
            default_los_position: 0.3,
            player_stroke_width: 3.0,
            label_offset: [15.0, 5.0],
            top_color: [0, 0, 255, 255],
            bottom_color: [255, 0, 0, 255],
            highlight_color: [255, 255, 255, 255],
            los_color: [0, 160, 255, 255],
            player_color: [255, 255, 0, 255],
        }
    }
}

/// Top-level application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the detection and timeline backend.
    pub backend_url: String,
    pub request_timeout_secs: u64,
    /// Interval between segmentation progress polls.
    pub poll_interval_ms: u64,
    /// Experiment whose timeline receives adjustments.
    pub experiment_id: Option<i64>,
    pub overlay: OverlayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 120,
            poll_interval_ms: 1000,
            experiment_id: None,
            overlay: OverlayConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load settings from a YAML or JSON file, chosen by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: AppConfig = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text)
                .map_err(|e| OverlayError::Config(format!("{}: {}", path.display(), e)))?,
            Some("json") => serde_json::from_str(&text)
                .map_err(|e| OverlayError::Config(format!("{}: {}", path.display(), e)))?,
            other => {
                return Err(OverlayError::Config(format!(
                    "unsupported config extension: {:?}",
                    other
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the overlay cannot work with.
    pub fn validate(&self) -> Result<()> {
        let o = &self.overlay;
        if !(o.hit_radius > 0.0) || !(o.hover_radius > 0.0) {
            return Err(OverlayError::Config("hit and hover radii must be positive".into()));
        }
        if !(o.los_near_width > 0.0) {
            return Err(OverlayError::Config("los_near_width must be positive".into()));
        }
        if !(0.0..=1.0).contains(&o.default_los_position) {
            return Err(OverlayError::Config(
                "default_los_position must be within [0, 1]".into(),
            ));
        }
        if o.ring_width > o.ring_radius {
            return Err(OverlayError::Config("ring_width exceeds ring_radius".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(OverlayError::Config("poll_interval_ms must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.overlay.los_near_width, 11.0);
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let path = std::env::temp_dir().join(format!("fieldmark-config-{}.yaml", std::process::id()));
        std::fs::write(&path, "backend_url: http://gpu-box:8000\noverlay:\n  hit_radius: 20\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.backend_url, "http://gpu-box:8000");
        assert_eq!(config.overlay.hit_radius, 20.0);
        assert_eq!(config.overlay.hover_radius, 50.0);
        assert_eq!(config.overlay.default_los_position, 0.3);
    }

    #[test]
    fn test_invalid_los_default_is_rejected() {
        let mut config = AppConfig::default();
        config.overlay.default_los_position = 1.5;
        assert!(matches!(config.validate(), Err(OverlayError::Config(_))));
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let path = std::env::temp_dir().join(format!("fieldmark-config-{}.toml", std::process::id()));
        std::fs::write(&path, "backend_url = 1").unwrap();
        let result = AppConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(OverlayError::Config(_))));
    }
}
