// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pointer interaction with the field bound points.
//!
//! The controller owns the transient drag and hover state. It never talks
//! to the network: a finished drag is reported back to the caller, which
//! persists the bounds.

use crate::models::bounds::{Bounds, Point, PointRef};

/// First bound point (top view 0..3, then bottom 0..3) strictly closer
/// than `radius` to `position`.
pub fn hit_test(position: Point, bounds: &Bounds, radius: f64) -> Option<PointRef> {
    bounds
        .iter()
        .find(|(_, p)| p.distance_to(&position) < radius)
        .map(|(at, _)| at)
}

/// A drag in progress. Lives from pointer-down to pointer-up/leave.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub target: PointRef,
    /// Pointer position minus point position at grab time.
    pub grab_offset: Point,
    /// Whether any move was applied during this gesture.
    pub moved: bool,
}

/// Pointer event in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up,
    Leave,
}

/// What a pointer event changed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerOutcome {
    /// A bound point moved.
    pub bounds_changed: bool,
    /// The hovered point changed.
    pub hover_changed: bool,
    /// A drag gesture ended; the bounds should be persisted.
    pub finished: Option<DragState>,
}

/// Drag and hover controller for the eight bound points.
#[derive(Debug, Clone)]
pub struct DragController {
    hit_radius: f64,
    hover_radius: f64,
    drag: Option<DragState>,
    hover: Option<PointRef>,
}

impl DragController {
    pub fn new(hit_radius: f64, hover_radius: f64) -> Self {
        Self {
            hit_radius,
            hover_radius,
            drag: None,
            hover: None,
        }
    }

    pub fn dragging(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    pub fn hovered(&self) -> Option<PointRef> {
        self.hover
    }

    /// Start dragging `hit`, remembering where on the point it was grabbed.
    pub fn begin_drag(&mut self, hit: PointRef, bounds: &Bounds, position: Point) -> bool {
        let Some(anchor) = bounds.get(hit) else {
            return false;
        };
        self.drag = Some(DragState {
            target: hit,
            grab_offset: position - anchor,
            moved: false,
        });
        log::debug!("Started dragging {}", hit.label());
        true
    }

    /// Move the dragged point so the original grab offset is preserved.
    /// The stored point is rounded to whole pixels.
    pub fn update_drag(&mut self, bounds: &mut Bounds, position: Point) -> Option<Point> {
        let drag = self.drag.as_mut()?;
        let point = (position - drag.grab_offset).rounded();
        if bounds.get(drag.target) == Some(point) {
            return None;
        }
        if bounds.set(drag.target, point) {
            drag.moved = true;
            Some(point)
        } else {
            None
        }
    }

    /// Finish the current drag, if any.
    pub fn end_drag(&mut self) -> Option<DragState> {
        let drag = self.drag.take()?;
        log::debug!("Stopped dragging {}", drag.target.label());
        Some(drag)
    }

    /// Recompute the hovered point. Ignored while dragging.
    /// Returns true if the hovered point changed.
    pub fn update_hover(&mut self, bounds: &Bounds, position: Point) -> bool {
        if self.drag.is_some() {
            return false;
        }
        let hover = hit_test(position, bounds, self.hover_radius);
        let changed = hover != self.hover;
        self.hover = hover;
        changed
    }

    /// Pointer left the canvas: drop both drag and hover.
    pub fn leave(&mut self) -> (Option<DragState>, bool) {
        let hover_changed = self.hover.take().is_some();
        (self.end_drag(), hover_changed)
    }

    /// Forget all transient state, e.g. when a new video is loaded.
    pub fn reset(&mut self) {
        self.drag = None;
        self.hover = None;
    }

    /// Apply one pointer event to `bounds`.
    pub fn handle(&mut self, event: PointerEvent, bounds: &mut Bounds) -> PointerOutcome {
        let mut outcome = PointerOutcome::default();
        match event {
            PointerEvent::Down(position) => {
                if let Some(hit) = hit_test(position, bounds, self.hit_radius) {
                    self.begin_drag(hit, bounds, position);
                }
            }
            PointerEvent::Move(position) => {
                if self.drag.is_some() {
                    outcome.bounds_changed = self.update_drag(bounds, position).is_some();
                } else {
                    outcome.hover_changed = self.update_hover(bounds, position);
                }
            }
            PointerEvent::Up => {
                outcome.finished = self.end_drag();
            }
            PointerEvent::Leave => {
                let (finished, hover_changed) = self.leave();
                outcome.finished = finished;
                outcome.hover_changed = hover_changed;
            }
        }
        outcome
    }
}
