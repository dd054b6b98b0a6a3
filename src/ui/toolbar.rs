// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar with the workflow steps and overlay controls.
//!
//! This module provides the buttons that drive the backend workflow
//! (bounds, players, segmentation), the player view mode selector and the
//! line-of-scrimmage slider.

use crate::models::session::{DetectionMode, ViewMode};

/// What the toolbar currently allows.
pub struct ToolbarState {
    pub has_video: bool,
    pub bounds_ready: bool,
    pub has_players: bool,
    pub busy: bool,
    pub job_running: bool,
    pub view_mode: ViewMode,
    pub detection_mode: DetectionMode,
    pub los_position: f64,
}

/// Result of toolbar interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolbarAction {
    None,
    DetectBounds,
    DetectPlayers,
    SegmentFirstFrame,
    SegmentFullVideo,
    SetViewMode(ViewMode),
    SetDetectionMode(DetectionMode),
    /// Slider moved; `committed` once the user lets go.
    MoveLos { position: f64, committed: bool },
}

/// Display the toolbar.
pub fn show(ui: &mut egui::Ui, state: &ToolbarState) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        let idle = !state.busy;

        if ui
            .add_enabled(idle && state.has_video, egui::Button::new("⛶ Detect Bounds"))
            .clicked()
        {
            action = ToolbarAction::DetectBounds;
        }
        if ui
            .add_enabled(idle && state.bounds_ready, egui::Button::new("👥 Detect Players"))
            .clicked()
        {
            action = ToolbarAction::DetectPlayers;
        }
        if ui
            .add_enabled(idle && state.has_players, egui::Button::new("✂ Segment Frame"))
            .clicked()
        {
            action = ToolbarAction::SegmentFirstFrame;
        }
        if ui
            .add_enabled(
                idle && state.has_players && !state.job_running,
                egui::Button::new("🎞 Segment Video"),
            )
            .clicked()
        {
            action = ToolbarAction::SegmentFullVideo;
        }

        ui.separator();

        ui.label("Detect in:");
        let mut detection_mode = state.detection_mode;
        egui::ComboBox::from_id_source("detection_mode")
            .selected_text(detection_mode.label())
            .show_ui(ui, |ui| {
                for mode in [DetectionMode::Field, DetectionMode::Los] {
                    ui.selectable_value(&mut detection_mode, mode, mode.label());
                }
            });
        if detection_mode != state.detection_mode {
            action = ToolbarAction::SetDetectionMode(detection_mode);
        }

        ui.separator();

        ui.label("Players:");
        for mode in ViewMode::ALL {
            if ui
                .selectable_label(state.view_mode == mode, mode.label())
                .clicked()
                && state.view_mode != mode
            {
                action = ToolbarAction::SetViewMode(mode);
            }
        }

        ui.separator();

        let mut los = state.los_position;
        let response = ui.add_enabled(
            state.bounds_ready,
            egui::Slider::new(&mut los, 0.0..=1.0)
                .text("Line of scrimmage")
                .fixed_decimals(3),
        );
        if response.changed() {
            action = ToolbarAction::MoveLos {
                position: los,
                committed: !response.dragged(),
            };
        } else if response.drag_stopped() {
            action = ToolbarAction::MoveLos {
                position: los,
                committed: true,
            };
        }
    });

    action
}
