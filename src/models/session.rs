// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation session state.
//!
//! This module holds everything the overlay needs for one loaded video:
//! the field bounds, the line-of-scrimmage position, detected players and
//! the active player view mode.

use super::bounds::Bounds;
use super::players::Players;
use serde::{Deserialize, Serialize};

/// How player boxes are drawn over the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Stroke a rectangle around each player.
    #[default]
    Bounds,
    /// Cut each player out of the line-of-scrimmage band.
    Occlude,
    /// Draw nothing for players.
    Hide,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [ViewMode::Bounds, ViewMode::Occlude, ViewMode::Hide];

    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Bounds => "Bounds",
            ViewMode::Occlude => "Occlude",
            ViewMode::Hide => "Hide",
        }
    }
}

/// Region the backend restricts player detection to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Whole field inside the bounds.
    #[default]
    Field,
    /// Only around the line of scrimmage.
    Los,
}

impl DetectionMode {
    pub fn label(&self) -> &'static str {
        match self {
            DetectionMode::Field => "Full field",
            DetectionMode::Los => "Line of scrimmage",
        }
    }
}

/// Complete session data for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    /// Video filename as known to the detection backend.
    pub video: String,
    pub frame_width: u32,
    pub frame_height: u32,
    pub bounds: Bounds,
    pub los_position: f64,
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default)]
    pub players: Players,
}

impl SessionData {
    /// Create a new session with empty bounds.
    pub fn new(video: String, frame_width: u32, frame_height: u32, los_position: f64) -> Self {
        Self {
            video,
            frame_width,
            frame_height,
            bounds: Bounds::default(),
            los_position,
            view_mode: ViewMode::default(),
            players: Players::default(),
        }
    }

    /// Set the line-of-scrimmage position, clamped to `[0, 1]`.
    /// Returns true if the stored value changed.
    pub fn set_los_position(&mut self, t: f64) -> bool {
        if !t.is_finite() {
            return false;
        }
        let t = t.clamp(0.0, 1.0);
        if (t - self.los_position).abs() < f64::EPSILON {
            return false;
        }
        self.los_position = t;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_los_position_is_clamped() {
        let mut session = SessionData::new("clip.mp4".into(), 1920, 1080, 0.3);
        assert!(session.set_los_position(1.7));
        assert_eq!(session.los_position, 1.0);
        assert!(!session.set_los_position(1.0));
        assert!(!session.set_los_position(f64::NAN));
        assert_eq!(session.los_position, 1.0);
    }

    #[test]
    fn test_view_mode_serializes_lowercase() {
        let json = serde_json::to_string(&ViewMode::Occlude).unwrap();
        assert_eq!(json, "\"occlude\"");
        let mode: DetectionMode = serde_json::from_str("\"los\"").unwrap();
        assert_eq!(mode, DetectionMode::Los);
    }
}
