// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Session properties panel.
//!
//! This module provides the side panel listing bound coordinates and
//! their axis-aligned boxes, detected players, segmentation progress and
//! results, the experiment timeline and the error log.

use super::timeline;
use crate::models::bounds::View;
use crate::models::experiment::{JobProgress, JobStatus, TimelineEntry};
use crate::models::session::SessionData;

/// A failed operation as shown in the error log.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub time: String,
    pub message: String,
}

impl ErrorRecord {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            message: message.into(),
        }
    }
}

/// Everything the panel displays.
pub struct PanelData<'a> {
    pub session: Option<&'a SessionData>,
    pub experiment_id: Option<i64>,
    pub timeline: &'a [TimelineEntry],
    pub job: Option<&'a JobProgress>,
    pub job_running: bool,
    pub results: &'a [String],
    pub errors: &'a [ErrorRecord],
    pub diagnostics: &'a [String],
}

/// Result of properties panel interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertiesAction {
    None,
    CancelJob,
    ClearErrors,
}

/// Display the properties panel.
pub fn show(ui: &mut egui::Ui, data: &PanelData<'_>) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    egui::ScrollArea::vertical().show(ui, |ui| {
        ui.heading("Session");
        ui.separator();

        let Some(session) = data.session else {
            ui.label("No video loaded");
            return;
        };

        ui.label(format!("Video: {}", session.video));
        ui.label(format!("Frame: {} × {}", session.frame_width, session.frame_height));
        ui.label(format!("Line of scrimmage: {:.3}", session.los_position));
        match data.experiment_id {
            Some(id) => ui.label(format!("Experiment: {}", id)),
            None => ui.weak("No experiment, changes stay local"),
        };

        ui.add_space(8.0);
        show_bounds(ui, session);

        ui.add_space(8.0);
        ui.heading("Players");
        ui.separator();
        if session.players.is_empty() {
            ui.label("No players detected");
        } else {
            for view in View::ALL {
                ui.label(format!("{}: {}", view.display_name(), session.players.view(view).len()));
            }
            ui.label(format!("Similarity: {:.0}%", session.players.similarity * 100.0));
        }

        if data.job.is_some() || !data.results.is_empty() {
            ui.add_space(8.0);
            ui.heading("Segmentation");
            ui.separator();
            if let Some(job) = data.job {
                if show_job(ui, job, data.job_running) {
                    action = PropertiesAction::CancelJob;
                }
            }
            for url in data.results {
                ui.hyperlink(url);
            }
        }

        ui.add_space(8.0);
        timeline::show(ui, data.timeline);

        if !data.diagnostics.is_empty() {
            ui.add_space(8.0);
            ui.collapsing(format!("Diagnostics ({})", data.diagnostics.len()), |ui| {
                for message in data.diagnostics {
                    ui.label(egui::RichText::new(message).small());
                }
            });
        }

        if !data.errors.is_empty() {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.heading("Errors");
                if ui.small_button("Clear").clicked() {
                    action = PropertiesAction::ClearErrors;
                }
            });
            ui.separator();
            for error in data.errors.iter().rev() {
                ui.horizontal_wrapped(|ui| {
                    ui.weak(&error.time);
                    ui.colored_label(egui::Color32::from_rgb(230, 90, 90), &error.message);
                });
            }
        }
    });

    action
}

fn show_bounds(ui: &mut egui::Ui, session: &SessionData) {
    ui.heading("Field Bounds");
    ui.separator();

    if session.bounds.is_empty() {
        ui.label("Not detected yet");
        return;
    }

    for view in View::ALL {
        let points = session.bounds.view(view);
        ui.collapsing(format!("{} ({} points)", view.display_name(), points.len()), |ui| {
            egui::Grid::new(format!("bounds_{:?}", view))
                .num_columns(3)
                .striped(true)
                .show(ui, |ui| {
                    for (index, point) in points.iter().enumerate() {
                        ui.label(format!("{}{}", view.label_prefix(), index + 1));
                        ui.label(format!("{:.0}", point.x));
                        ui.label(format!("{:.0}", point.y));
                        ui.end_row();
                    }
                });
            if let Some(aabb) = session.bounds.aabb(view) {
                ui.label(format!(
                    "AABB x {:.0}..{:.0}  y {:.0}..{:.0}",
                    aabb.min_x, aabb.max_x, aabb.min_y, aabb.max_y
                ));
            }
        });
    }
}

/// Returns true if the cancel button was clicked.
fn show_job(ui: &mut egui::Ui, job: &JobProgress, running: bool) -> bool {
    let fraction = (job.percent / 100.0).clamp(0.0, 1.0) as f32;
    let mut text = format!("{:.0}%", job.percent);
    if let (Some(current), Some(total)) = (job.current_frame, job.total_frames) {
        text.push_str(&format!("  frame {}/{}", current, total));
    }
    ui.add(egui::ProgressBar::new(fraction).text(text));

    let message = if job.message.is_empty() {
        format!("{:?}", job.status)
    } else {
        job.message.clone()
    };
    match job.status {
        JobStatus::Error => ui.colored_label(egui::Color32::from_rgb(230, 90, 90), message),
        _ => ui.label(message),
    };

    running && ui.button("Stop polling").clicked()
}
