// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for the video frame and the field overlay.
//!
//! This module displays the frame, paints the rasterized overlay layer on
//! top of it and turns raw pointer input into frame-space pointer events.

use super::drag::PointerEvent;
use super::overlay::{compose, OverlayScene, SceneInput};
use crate::config::OverlayConfig;
use crate::util::geometry::{frame_to_screen, screen_to_frame, Viewport};

/// Canvas state that survives between frames.
#[derive(Default)]
pub struct CanvasState {
    overlay_texture: Option<egui::TextureHandle>,
    scene: Option<OverlayScene>,
    dirty: bool,
    pointer_inside: bool,
}

impl CanvasState {
    pub fn new() -> Self {
        Self {
            dirty: true,
            ..Default::default()
        }
    }

    /// Request a full redraw of the overlay on the next frame.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Drop the overlay entirely, e.g. when a different video is loaded.
    pub fn clear(&mut self) {
        self.overlay_texture = None;
        self.scene = None;
        self.dirty = true;
        self.pointer_inside = false;
    }

    /// Recompose and re-upload the overlay if anything changed since the
    /// last redraw. Returns the diagnostics of a fresh redraw.
    pub fn refresh(
        &mut self,
        ctx: &egui::Context,
        input: &SceneInput<'_>,
        config: &OverlayConfig,
        frame_size: (u32, u32),
    ) -> Option<Vec<String>> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;

        let scene = compose(input, config, frame_size.0, frame_size.1);
        let layer = scene.rasterize();
        let size = [layer.width() as usize, layer.height() as usize];
        let image = egui::ColorImage::from_rgba_unmultiplied(size, layer.as_raw());

        match self.overlay_texture {
            Some(ref mut texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.overlay_texture =
                    Some(ctx.load_texture("field_overlay", image, egui::TextureOptions::LINEAR));
            }
        }

        let diagnostics = scene.diagnostics.clone();
        self.scene = Some(scene);
        Some(diagnostics)
    }
}

/// Display the main canvas area and collect pointer events.
pub fn show(
    ui: &mut egui::Ui,
    state: &mut CanvasState,
    frame_texture: &Option<egui::TextureHandle>,
    frame_size: Option<(u32, u32)>,
    status: &str,
) -> Vec<PointerEvent> {
    let mut events = Vec::new();
    // Set background color
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);

    let available_size = ui.available_size();

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available_size);

        let (Some(texture), Some((frame_width, frame_height))) = (frame_texture, frame_size) else {
            show_welcome(ui);
            return;
        };

        let available = ui.available_rect_before_wrap();
        let viewport = Viewport::fit(
            frame_width,
            frame_height,
            Viewport {
                x: available.min.x as f64,
                y: available.min.y as f64,
                width: available.width() as f64,
                height: available.height() as f64,
            },
        );
        let image_rect = egui::Rect::from_min_size(
            egui::pos2(viewport.x as f32, viewport.y as f32),
            egui::vec2(viewport.width as f32, viewport.height as f32),
        );
        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

        // Keep drags on the frame from moving the window
        ui.allocate_rect(image_rect, egui::Sense::click_and_drag());

        let painter = ui.painter();
        painter.image(texture.id(), image_rect, uv, egui::Color32::WHITE);
        if let Some(ref overlay) = state.overlay_texture {
            painter.image(overlay.id(), image_rect, uv, egui::Color32::WHITE);
        }

        if let Some(ref scene) = state.scene {
            for (anchor, text, color) in scene.labels() {
                let (sx, sy) = frame_to_screen(anchor, frame_width, frame_height, &viewport);
                painter.text(
                    egui::pos2(sx as f32, sy as f32),
                    egui::Align2::LEFT_BOTTOM,
                    text,
                    egui::FontId::proportional(12.0),
                    egui::Color32::from_rgba_unmultiplied(color[0], color[1], color[2], color[3]),
                );
            }
        }

        let (hover_pos, pressed, released) = ui.input(|i| {
            (
                i.pointer.hover_pos(),
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
            )
        });

        match hover_pos.filter(|p| viewport.contains(p.x as f64, p.y as f64)) {
            Some(pos) => {
                state.pointer_inside = true;
                let point = screen_to_frame(pos.x as f64, pos.y as f64, frame_width, frame_height, &viewport);
                if pressed {
                    events.push(PointerEvent::Down(point));
                }
                events.push(PointerEvent::Move(point));
                if released {
                    events.push(PointerEvent::Up);
                }
            }
            None => {
                if state.pointer_inside {
                    state.pointer_inside = false;
                    events.push(PointerEvent::Leave);
                }
            }
        }
    });

    ui.separator();
    ui.horizontal(|ui| {
        ui.label(status);
    });

    events
}

fn show_welcome(ui: &mut egui::Ui) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.heading(
                egui::RichText::new("fieldmark")
                    .size(32.0)
                    .color(egui::Color32::from_gray(200)),
            );
            ui.label(
                egui::RichText::new("Stereo field bounds and line of scrimmage")
                    .size(14.0)
                    .color(egui::Color32::from_gray(150)),
            );
            ui.add_space(20.0);
            ui.label(
                egui::RichText::new("Upload a video and open its first frame to begin")
                    .color(egui::Color32::from_gray(180)),
            );
            ui.add_space(10.0);
            ui.label(
                egui::RichText::new("File → Upload Video...")
                    .weak()
                    .color(egui::Color32::from_gray(130)),
            );
        });
    });
}
