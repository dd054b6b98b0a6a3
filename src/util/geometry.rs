// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides the coordinate transforms between frame pixels and
//! screen space, and the tapered line-of-scrimmage polygon.

use crate::error::{OverlayError, Result};
use crate::models::bounds::{Point, Quadrilateral};

/// Screen-space rectangle the frame is displayed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Largest rectangle with the frame's aspect ratio that fits inside
    /// `available`, centered in it.
    pub fn fit(frame_width: u32, frame_height: u32, available: Viewport) -> Self {
        let frame_aspect = frame_width as f64 / frame_height.max(1) as f64;
        let available_aspect = available.width / available.height.max(f64::EPSILON);

        let (width, height) = if frame_aspect > available_aspect {
            // Frame is wider - fit to width
            (available.width, available.width / frame_aspect)
        } else {
            // Frame is taller - fit to height
            (available.height * frame_aspect, available.height)
        };

        Self {
            x: available.x + (available.width - width) / 2.0,
            y: available.y + (available.height - height) / 2.0,
            width,
            height,
        }
    }

    pub fn contains(&self, sx: f64, sy: f64) -> bool {
        sx >= self.x && sx <= self.x + self.width && sy >= self.y && sy <= self.y + self.height
    }
}

/// Convert screen coordinates to frame pixel coordinates.
pub fn screen_to_frame(sx: f64, sy: f64, frame_width: u32, frame_height: u32, viewport: &Viewport) -> Point {
    Point {
        x: (sx - viewport.x) / viewport.width * frame_width as f64,
        y: (sy - viewport.y) / viewport.height * frame_height as f64,
    }
}

/// Convert frame pixel coordinates to screen coordinates.
pub fn frame_to_screen(point: &Point, frame_width: u32, frame_height: u32, viewport: &Viewport) -> (f64, f64) {
    (
        viewport.x + point.x / frame_width as f64 * viewport.width,
        viewport.y + point.y / frame_height as f64 * viewport.height,
    )
}

/// Linear interpolation between `a` and `b`.
pub fn lerp(a: Point, b: Point, t: f64) -> Point {
    a + (b - a) * t
}

/// Compute the tapered line-of-scrimmage band across `quad` at depth `t`.
///
/// The band runs from the far edge (`p1 -> p2`) to the near edge
/// (`p4 -> p3`). It is `near_width` wide at the near edge and scaled by
/// `far_len / near_len` at the far edge. Corners are returned as far-left,
/// far-right, near-right, near-left.
pub fn los_polygon(quad: &Quadrilateral, t: f64, near_width: f64) -> Result<Quadrilateral> {
    if !t.is_finite() {
        return Err(OverlayError::InvalidGeometry(format!("non-finite position {t}")));
    }
    let t = t.clamp(0.0, 1.0);
    let [p1, p2, p3, p4] = *quad;

    let far_len = p1.distance_to(&p2);
    let near_len = p4.distance_to(&p3);
    if !(near_len > 0.0) || !far_len.is_finite() {
        return Err(OverlayError::InvalidGeometry("near edge has zero length".into()));
    }
    let far_width = near_width * (far_len / near_len);

    let far = lerp(p1, p2, t);
    let near = lerp(p4, p3, t);

    let axis = near - far;
    let axis_len = axis.length();
    if !(axis_len > 0.0) || !axis_len.is_finite() {
        return Err(OverlayError::InvalidGeometry(
            "far and near points coincide".into(),
        ));
    }
    let u = axis * (1.0 / axis_len);
    let n = Point::new(-u.y, u.x);

    Ok([
        far - n * (far_width / 2.0),
        far + n * (far_width / 2.0),
        near + n * (near_width / 2.0),
        near - n * (near_width / 2.0),
    ])
}
