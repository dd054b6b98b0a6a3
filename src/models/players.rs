// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Player detections returned by the backend.

use super::bounds::{Aabb, View};
use serde::{Deserialize, Serialize};

/// A detected player box in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(default)]
    pub confidence: f64,
}

impl PlayerBox {
    /// Extent of the box with corners normalized.
    pub fn aabb(&self) -> Aabb {
        Aabb {
            min_x: self.x1.min(self.x2),
            max_x: self.x1.max(self.x2),
            min_y: self.y1.min(self.y2),
            max_y: self.y1.max(self.y2),
        }
    }
}

/// Player boxes for both views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Players {
    #[serde(default)]
    pub top: Vec<PlayerBox>,
    #[serde(default)]
    pub bottom: Vec<PlayerBox>,
    /// Count agreement between the two views (0.0 to 1.0).
    #[serde(default)]
    pub similarity: f64,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Players {
    pub fn view(&self, view: View) -> &[PlayerBox] {
        match view {
            View::Top => &self.top,
            View::Bottom => &self.bottom,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerBox> {
        self.top.iter().chain(self.bottom.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.bottom.is_empty()
    }
}
