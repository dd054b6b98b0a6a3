// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Experiment timeline list.
//!
//! Shows the recorded history of the current experiment, newest last, with
//! a short summary of each entry's payload.

use crate::models::experiment::{StepType, TimelineEntry};
use chrono::{DateTime, Local, NaiveDateTime};
use serde_json::Value;

/// Local wall-clock time of an ISO-8601 timestamp, or the raw text if it
/// does not parse. Timestamps without an offset are shown as written.
pub fn format_timestamp(timestamp: &str) -> String {
    if let Ok(time) = DateTime::parse_from_rfc3339(timestamp) {
        return time.with_timezone(&Local).format("%H:%M:%S").to_string();
    }
    match NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(time) => time.format("%H:%M:%S").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

fn count(data: &Value, key: &str) -> u64 {
    data.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn array_len(data: &Value, key: &str) -> Option<usize> {
    data.get(key).and_then(Value::as_array).map(Vec::len)
}

/// Detail lines shown under an entry's title.
pub fn summarize(entry: &TimelineEntry) -> Vec<String> {
    let Some(data) = entry.data.as_ref().filter(|d| !d.is_null()) else {
        return Vec::new();
    };

    match entry.step_type {
        StepType::VideoLoaded => {
            let name = data
                .get("video_name")
                .and_then(Value::as_str)
                .or_else(|| {
                    data.get("video_url")
                        .and_then(Value::as_str)
                        .and_then(|url| url.rsplit('/').next())
                })
                .unwrap_or("unknown video");
            vec![format!("📹 {}", name)]
        }
        StepType::BoundsAdjusted => {
            let mut lines = Vec::new();
            if let Some(n) = array_len(data, "top_corners") {
                lines.push(format!("🔵 Left (Top): {} corners", n));
            }
            if let Some(n) = array_len(data, "bottom_corners") {
                lines.push(format!("🔴 Right (Bottom): {} corners", n));
            }
            lines
        }
        StepType::LosAdjusted => data
            .get("los_position")
            .and_then(Value::as_f64)
            .map(|t| vec![format!("Position: {:.3}", t)])
            .unwrap_or_default(),
        StepType::PlayersDetected => {
            let mut line = format!(
                "Left: {}  Right: {}",
                count(data, "top_count"),
                count(data, "bottom_count")
            );
            if let Some(similarity) = data.get("similarity").and_then(Value::as_f64) {
                line.push_str(&format!("  Similarity: {:.0}%", similarity * 100.0));
            }
            vec![line]
        }
        StepType::SegmentationCompleted => {
            let total = count(data, "top_player_count") + count(data, "bottom_player_count");
            let mut lines = vec![format!("Segmented {} players total", total)];
            if let Some(url) = data.get("result_url").and_then(Value::as_str) {
                lines.push(url.to_string());
            }
            lines
        }
        StepType::Other => match serde_json::to_string_pretty(data) {
            Ok(text) if data.as_object().map_or(true, |o| !o.is_empty()) => vec![text],
            _ => Vec::new(),
        },
    }
}

/// Display the timeline entries.
pub fn show(ui: &mut egui::Ui, entries: &[TimelineEntry]) {
    ui.heading("Experiment Timeline");
    ui.separator();

    if entries.is_empty() {
        ui.label("No timeline entries yet");
        ui.label(
            egui::RichText::new("Actions will appear here as you work through the experiment")
                .weak()
                .small(),
        );
        return;
    }

    egui::ScrollArea::vertical()
        .id_source("timeline_scroll")
        .max_height(240.0)
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for entry in entries {
                ui.horizontal(|ui| {
                    ui.strong(entry.step_type.title());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.weak(format_timestamp(&entry.timestamp));
                    });
                });
                for line in summarize(entry) {
                    ui.label(egui::RichText::new(line).small());
                }
                ui.add_space(4.0);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(step_type: StepType, data: Value) -> TimelineEntry {
        TimelineEntry {
            id: Some(1),
            step_type,
            timestamp: "2025-03-01T10:00:00Z".into(),
            data: Some(data),
        }
    }

    #[test]
    fn test_video_name_falls_back_to_url() {
        let lines = summarize(&entry(
            StepType::VideoLoaded,
            json!({"video_url": "http://host/uploads/clip.mp4"}),
        ));
        assert_eq!(lines, vec!["📹 clip.mp4".to_string()]);
    }

    #[test]
    fn test_players_summary() {
        let lines = summarize(&entry(
            StepType::PlayersDetected,
            json!({"top_count": 11, "bottom_count": 10, "similarity": 0.9}),
        ));
        assert_eq!(lines, vec!["Left: 11  Right: 10  Similarity: 90%".to_string()]);
    }

    #[test]
    fn test_segmentation_total() {
        let lines = summarize(&entry(
            StepType::SegmentationCompleted,
            json!({"top_player_count": 3, "bottom_player_count": 4}),
        ));
        assert_eq!(lines[0], "Segmented 7 players total");
    }

    #[test]
    fn test_null_data_has_no_details() {
        assert!(summarize(&entry(StepType::BoundsAdjusted, Value::Null)).is_empty());
        assert!(summarize(&entry(StepType::Other, json!({}))).is_empty());
    }

    #[test]
    fn test_unparseable_timestamp_is_kept() {
        assert_eq!(format_timestamp("yesterday"), "yesterday");
        assert_eq!(format_timestamp("2025-03-01T10:00:00Z").len(), 8);
        assert_eq!(format_timestamp("2025-03-01T10:04:05.123456"), "10:04:05");
    }
}
