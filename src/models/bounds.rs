// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Field bounds data structures.
//!
//! This module defines the points, the per-view quadrilaterals and the
//! derived bounding boxes that the overlay edits and renders.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A 2D point in video-frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length of the point taken as a vector.
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (*self - *other).length()
    }

    /// Round both coordinates to whole pixels.
    pub fn rounded(&self) -> Self {
        Self::new(self.x.round(), self.y.round())
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Four corners `[p1, p2, p3, p4]`: `p1 -> p2` is the far edge and
/// `p4 -> p3` is the near edge.
pub type Quadrilateral = [Point; 4];

/// One of the two stereo camera views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Left eye, upper half of the frame.
    Top,
    /// Right eye, lower half of the frame.
    Bottom,
}

impl View {
    pub const ALL: [View; 2] = [View::Top, View::Bottom];

    /// Label prefix used on the canvas (`L1`..`L4`, `R1`..`R4`).
    pub fn label_prefix(&self) -> char {
        match self {
            View::Top => 'L',
            View::Bottom => 'R',
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            View::Top => "Left (Top)",
            View::Bottom => "Right (Bottom)",
        }
    }
}

/// Address of a single bound point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointRef {
    pub view: View,
    pub index: usize,
}

impl PointRef {
    pub fn new(view: View, index: usize) -> Self {
        Self { view, index }
    }

    pub fn label(&self) -> String {
        format!("{}{}", self.view.label_prefix(), self.index + 1)
    }
}

/// Axis-aligned bounding box derived from a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Aabb {
    /// Min/max reduction over `points`; `None` when there are no points.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let init = Aabb {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };
        Some(points.iter().skip(1).fold(init, |acc, p| Aabb {
            min_x: acc.min_x.min(p.x),
            max_x: acc.max_x.max(p.x),
            min_y: acc.min_y.min(p.y),
            max_y: acc.max_y.max(p.y),
        }))
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Field corners for both stereo views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub top: Vec<Point>,
    pub bottom: Vec<Point>,
}

impl Bounds {
    pub fn new(top: Vec<Point>, bottom: Vec<Point>) -> Self {
        Self { top, bottom }
    }

    pub fn view(&self, view: View) -> &[Point] {
        match view {
            View::Top => &self.top,
            View::Bottom => &self.bottom,
        }
    }

    fn view_mut(&mut self, view: View) -> &mut Vec<Point> {
        match view {
            View::Top => &mut self.top,
            View::Bottom => &mut self.bottom,
        }
    }

    pub fn get(&self, at: PointRef) -> Option<Point> {
        self.view(at.view).get(at.index).copied()
    }

    /// Overwrite one point; returns false if the address does not exist
    /// or the point is not finite.
    pub fn set(&mut self, at: PointRef, point: Point) -> bool {
        if !point.is_finite() {
            return false;
        }
        match self.view_mut(at.view).get_mut(at.index) {
            Some(slot) => {
                *slot = point;
                true
            }
            None => false,
        }
    }

    /// All points in hit-test order: top view first, then bottom.
    pub fn iter(&self) -> impl Iterator<Item = (PointRef, Point)> + '_ {
        View::ALL.into_iter().flat_map(move |view| {
            self.view(view)
                .iter()
                .enumerate()
                .map(move |(index, p)| (PointRef::new(view, index), *p))
        })
    }

    /// The view as a quadrilateral, if it has exactly four points.
    pub fn quad(&self, view: View) -> Option<Quadrilateral> {
        <[Point; 4]>::try_from(self.view(view)).ok()
    }

    pub fn aabb(&self, view: View) -> Option<Aabb> {
        Aabb::from_points(self.view(view))
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.bottom.is_empty()
    }
}
