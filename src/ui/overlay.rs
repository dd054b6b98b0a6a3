// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Field overlay rendering.
//!
//! The overlay is first composed into an ordered list of draw operations
//! from the session state, then rasterized into a transparent RGBA layer
//! at frame resolution. Text labels are left to the canvas, which paints
//! them on top of the layer.

use crate::config::{OverlayConfig, Rgba as ConfigRgba};
use crate::models::bounds::{Aabb, Bounds, Point, PointRef, Quadrilateral, View};
use crate::models::players::Players;
use crate::models::session::ViewMode;
use crate::util::geometry::los_polygon;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_ellipse_mut, draw_hollow_circle_mut, draw_hollow_rect_mut, draw_polygon_mut,
};
use imageproc::point::Point as PixelPoint;
use imageproc::rect::Rect;

const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// A single drawing step, in frame pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Opaque line-of-scrimmage band.
    FillPolygon { points: Quadrilateral, color: Rgba<u8> },
    /// Player box outline.
    StrokeRect { bounds: Aabb, width: f32, color: Rgba<u8> },
    /// Clear everything drawn so far inside the ellipse inscribed in `bounds`.
    EraseEllipse { bounds: Aabb },
    /// Bound point ring with a clear center.
    Ring { center: Point, radius: f32, width: f32, color: Rgba<u8> },
    /// Text anchored at `anchor`; painted by the canvas.
    Label { anchor: Point, text: String, color: Rgba<u8> },
}

/// Everything that feeds one overlay redraw.
#[derive(Debug, Clone, Copy)]
pub struct SceneInput<'a> {
    pub bounds: &'a Bounds,
    pub hover: Option<PointRef>,
    pub los_position: f64,
    pub players: &'a Players,
    pub view_mode: ViewMode,
}

/// Composed overlay for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayScene {
    pub width: u32,
    pub height: u32,
    pub ops: Vec<DrawOp>,
    /// Geometry problems that caused a shape to be skipped.
    pub diagnostics: Vec<String>,
}

fn color(c: ConfigRgba) -> Rgba<u8> {
    Rgba(c)
}

fn view_color(view: View, config: &OverlayConfig) -> Rgba<u8> {
    match view {
        View::Top => color(config.top_color),
        View::Bottom => color(config.bottom_color),
    }
}

/// Build the draw list for the current state.
///
/// Order: line-of-scrimmage bands, player boxes (stroke or erase), point
/// rings, then labels. Geometry failures never abort the redraw.
pub fn compose(input: &SceneInput<'_>, config: &OverlayConfig, width: u32, height: u32) -> OverlayScene {
    let mut ops = Vec::new();
    let mut diagnostics = Vec::new();

    if let (Some(top), Some(bottom)) = (input.bounds.quad(View::Top), input.bounds.quad(View::Bottom)) {
        for (view, quad) in [(View::Top, top), (View::Bottom, bottom)] {
            match los_polygon(&quad, input.los_position, config.los_near_width) {
                Ok(points) => ops.push(DrawOp::FillPolygon {
                    points,
                    color: color(config.los_color),
                }),
                Err(e) => {
                    log::warn!("Skipping line of scrimmage for {}: {}", view.display_name(), e);
                    diagnostics.push(format!("{}: {}", view.display_name(), e));
                }
            }
        }
    }

    match input.view_mode {
        ViewMode::Bounds => ops.extend(input.players.iter().map(|p| DrawOp::StrokeRect {
            bounds: p.aabb(),
            width: config.player_stroke_width,
            color: color(config.player_color),
        })),
        ViewMode::Occlude => ops.extend(
            input
                .players
                .iter()
                .map(|p| DrawOp::EraseEllipse { bounds: p.aabb() }),
        ),
        ViewMode::Hide => {}
    }

    for (at, point) in input.bounds.iter() {
        ops.push(DrawOp::Ring {
            center: point,
            radius: config.ring_radius,
            width: config.ring_width,
            color: view_color(at.view, config),
        });
        if input.hover == Some(at) {
            ops.push(DrawOp::Ring {
                center: point,
                radius: config.highlight_radius,
                width: config.highlight_width,
                color: color(config.highlight_color),
            });
        }
    }

    let [dx, dy] = config.label_offset;
    for (at, point) in input.bounds.iter() {
        ops.push(DrawOp::Label {
            anchor: Point::new(point.x + dx, point.y + dy),
            text: at.label(),
            color: Rgba([255, 255, 255, 255]),
        });
    }

    OverlayScene {
        width,
        height,
        ops,
        diagnostics,
    }
}

fn pixel(p: &Point) -> PixelPoint<i32> {
    let r = p.rounded();
    PixelPoint::new(r.x as i32, r.y as i32)
}

impl OverlayScene {
    /// Labels to be painted as text over the rasterized layer.
    pub fn labels(&self) -> impl Iterator<Item = (&Point, &str, Rgba<u8>)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Label { anchor, text, color } => Some((anchor, text.as_str(), *color)),
            _ => None,
        })
    }

    /// Rasterize all shapes into a fresh, fully transparent layer.
    pub fn rasterize(&self) -> RgbaImage {
        let mut layer = RgbaImage::from_pixel(self.width, self.height, CLEAR);
        for op in &self.ops {
            match op {
                DrawOp::FillPolygon { points, color } => fill_polygon(&mut layer, points, *color),
                DrawOp::StrokeRect { bounds, width, color } => {
                    stroke_rect(&mut layer, bounds, *width, *color)
                }
                DrawOp::EraseEllipse { bounds } => erase_ellipse(&mut layer, bounds),
                DrawOp::Ring {
                    center,
                    radius,
                    width,
                    color,
                } => ring(&mut layer, center, *radius, *width, *color),
                DrawOp::Label { .. } => {}
            }
        }
        layer
    }
}

fn fill_polygon(layer: &mut RgbaImage, points: &Quadrilateral, color: Rgba<u8>) {
    let mut poly: Vec<PixelPoint<i32>> = Vec::with_capacity(points.len());
    for p in points.iter().map(pixel) {
        if poly.last() != Some(&p) {
            poly.push(p);
        }
    }
    // The polygon is closed implicitly
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    if poly.len() < 2 {
        return;
    }
    draw_polygon_mut(layer, &poly, color);
}

fn stroke_rect(layer: &mut RgbaImage, bounds: &Aabb, width: f32, color: Rgba<u8>) {
    let min = pixel(&Point::new(bounds.min_x, bounds.min_y));
    let max = pixel(&Point::new(bounds.max_x, bounds.max_y));
    let (w, h) = (max.x - min.x, max.y - min.y);
    for k in 0..width.round().max(1.0) as i32 {
        let (rw, rh) = (w - 2 * k, h - 2 * k);
        if rw <= 0 || rh <= 0 {
            break;
        }
        draw_hollow_rect_mut(layer, Rect::at(min.x + k, min.y + k).of_size(rw as u32, rh as u32), color);
    }
}

fn erase_ellipse(layer: &mut RgbaImage, bounds: &Aabb) {
    let center = pixel(&bounds.center());
    let rx = (bounds.width() / 2.0).round() as i32;
    let ry = (bounds.height() / 2.0).round() as i32;
    if rx < 1 || ry < 1 {
        return;
    }
    draw_filled_ellipse_mut(layer, (center.x, center.y), rx, ry, CLEAR);
}

fn ring(layer: &mut RgbaImage, center: &Point, radius: f32, width: f32, color: Rgba<u8>) {
    let c = pixel(center);
    let outer = radius.round() as i32;
    let inner = (radius - width).round().max(0.0) as i32;
    for r in (inner + 1).max(1)..=outer {
        draw_hollow_circle_mut(layer, (c.x, c.y), r, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::players::PlayerBox;

    fn bounds() -> Bounds {
        Bounds::new(
            vec![
                Point::new(100.0, 100.0),
                Point::new(300.0, 100.0),
                Point::new(320.0, 300.0),
                Point::new(80.0, 300.0),
            ],
            vec![
                Point::new(100.0, 500.0),
                Point::new(300.0, 500.0),
                Point::new(320.0, 700.0),
                Point::new(80.0, 700.0),
            ],
        )
    }

    fn players() -> Players {
        Players {
            top: vec![PlayerBox { x1: 190.0, y1: 180.0, x2: 210.0, y2: 220.0, confidence: 0.8 }],
            bottom: Vec::new(),
            similarity: 0.0,
            metadata: serde_json::Value::Null,
        }
    }

    fn scene(bounds: &Bounds, players: &Players, view_mode: ViewMode, hover: Option<PointRef>) -> OverlayScene {
        let input = SceneInput {
            bounds,
            hover,
            los_position: 0.5,
            players,
            view_mode,
        };
        compose(&input, &OverlayConfig::default(), 400, 800)
    }

    fn count(scene: &OverlayScene, pred: impl Fn(&DrawOp) -> bool) -> usize {
        scene.ops.iter().filter(|op| pred(op)).count()
    }

    #[test]
    fn test_compose_draws_points_labels_and_bands() {
        let (b, p) = (bounds(), players());
        let s = scene(&b, &p, ViewMode::Hide, None);
        assert_eq!(count(&s, |op| matches!(op, DrawOp::FillPolygon { .. })), 2);
        assert_eq!(count(&s, |op| matches!(op, DrawOp::Ring { .. })), 8);
        let labels: Vec<&str> = s.labels().map(|(_, t, _)| t).collect();
        assert_eq!(labels, ["L1", "L2", "L3", "L4", "R1", "R2", "R3", "R4"]);
        assert_eq!(count(&s, |op| matches!(op, DrawOp::StrokeRect { .. } | DrawOp::EraseEllipse { .. })), 0);
    }

    #[test]
    fn test_hover_adds_highlight_ring() {
        let (b, p) = (bounds(), players());
        let s = scene(&b, &p, ViewMode::Hide, Some(PointRef::new(View::Bottom, 2)));
        assert_eq!(count(&s, |op| matches!(op, DrawOp::Ring { .. })), 9);
    }

    #[test]
    fn test_bands_need_both_quadrilaterals() {
        let (mut b, p) = (bounds(), players());
        b.bottom.truncate(3);
        let s = scene(&b, &p, ViewMode::Hide, None);
        assert_eq!(count(&s, |op| matches!(op, DrawOp::FillPolygon { .. })), 0);
        assert!(s.diagnostics.is_empty());
    }

    #[test]
    fn test_degenerate_view_is_skipped_with_diagnostic() {
        let (mut b, p) = (bounds(), players());
        b.bottom[3] = b.bottom[2];
        let s = scene(&b, &p, ViewMode::Bounds, None);
        assert_eq!(count(&s, |op| matches!(op, DrawOp::FillPolygon { .. })), 1);
        assert_eq!(s.diagnostics.len(), 1);
        // The rest of the overlay is still drawn
        assert_eq!(count(&s, |op| matches!(op, DrawOp::Ring { .. })), 8);
        let _ = s.rasterize();
    }

    #[test]
    fn test_occlude_erases_band_under_players() {
        let (b, p) = (bounds(), players());
        let layer = scene(&b, &p, ViewMode::Occlude, None).rasterize();
        // Center of the player box lies on the band but is cut away
        assert_eq!(layer.get_pixel(200, 200)[3], 0);
        // Band outside the player is still opaque
        assert_eq!(*layer.get_pixel(200, 150), Rgba(OverlayConfig::default().los_color));
        assert_eq!(*layer.get_pixel(200, 600), Rgba(OverlayConfig::default().los_color));
    }

    #[test]
    fn test_bounds_mode_strokes_player_boxes() {
        let (b, p) = (bounds(), players());
        let layer = scene(&b, &p, ViewMode::Bounds, None).rasterize();
        let yellow = Rgba(OverlayConfig::default().player_color);
        assert_eq!(*layer.get_pixel(190, 180), yellow);
        assert_eq!(*layer.get_pixel(192, 200), yellow);
        assert_eq!(*layer.get_pixel(200, 200), Rgba(OverlayConfig::default().los_color));
    }

    #[test]
    fn test_mode_switch_redraws_from_clear_layer() {
        let (b, p) = (bounds(), players());
        let bounds_layer = scene(&b, &p, ViewMode::Bounds, None).rasterize();
        assert_ne!(bounds_layer.get_pixel(190, 180)[3], 0);

        let occlude_layer = scene(&b, &p, ViewMode::Occlude, None).rasterize();
        assert_eq!(occlude_layer.get_pixel(190, 180)[3], 0);
        assert_eq!(occlude_layer.get_pixel(192, 200)[3], 0);

        let hidden_layer = scene(&b, &p, ViewMode::Hide, None).rasterize();
        assert_eq!(hidden_layer.get_pixel(190, 180)[3], 0);
        assert_eq!(*hidden_layer.get_pixel(200, 200), Rgba(OverlayConfig::default().los_color));
    }

    #[test]
    fn test_ring_center_is_clear() {
        let (b, p) = (bounds(), players());
        let layer = scene(&b, &p, ViewMode::Hide, None).rasterize();
        let blue = Rgba(OverlayConfig::default().top_color);
        assert_eq!(layer.get_pixel(100, 100)[3], 0);
        assert_eq!(*layer.get_pixel(110, 100), blue);
    }

    #[test]
    fn test_shapes_outside_the_frame_are_clipped() {
        let b = Bounds::new(
            vec![
                Point::new(-500.0, -500.0),
                Point::new(900.0, -500.0),
                Point::new(900.0, 1200.0),
                Point::new(-500.0, 1200.0),
            ],
            vec![
                Point::new(-500.0, -500.0),
                Point::new(900.0, -500.0),
                Point::new(900.0, 1200.0),
                Point::new(-500.0, 1200.0),
            ],
        );
        let p = Players {
            top: vec![PlayerBox { x1: -50.0, y1: -50.0, x2: 5000.0, y2: 30.0, confidence: 1.0 }],
            ..Players::default()
        };
        let layer = scene(&b, &p, ViewMode::Bounds, None).rasterize();
        assert_eq!(layer.dimensions(), (400, 800));
    }
}
