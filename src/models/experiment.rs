// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Experiment timeline and background job records.

use super::bounds::{Aabb, Bounds, Point, View};
use serde::{Deserialize, Serialize};

/// Kind of step recorded on an experiment timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    VideoLoaded,
    BoundsAdjusted,
    LosAdjusted,
    PlayersDetected,
    SegmentationCompleted,
    #[serde(other)]
    Other,
}

impl StepType {
    pub fn title(&self) -> &'static str {
        match self {
            StepType::VideoLoaded => "Video Loaded",
            StepType::BoundsAdjusted => "Field Bounds Adjusted",
            StepType::LosAdjusted => "Line of Scrimmage Moved",
            StepType::PlayersDetected => "Players Detected",
            StepType::SegmentationCompleted => "Segmentation Completed",
            StepType::Other => "Other",
        }
    }
}

/// One entry of an experiment's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    #[serde(default)]
    pub id: Option<i64>,
    pub step_type: StepType,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Experiment with its full timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
}

impl Experiment {
    /// Bounds from the most recent `bounds_adjusted` entry, if any.
    pub fn latest_bounds(&self) -> Option<Bounds> {
        self.timeline
            .iter()
            .rev()
            .filter(|e| e.step_type == StepType::BoundsAdjusted)
            .find_map(|e| {
                let data = e.data.clone()?;
                serde_json::from_value::<BoundsAdjusted>(data)
                    .ok()
                    .map(|b| Bounds::new(b.top_corners, b.bottom_corners))
            })
    }

    /// Line-of-scrimmage position from the most recent `los_adjusted` entry.
    pub fn latest_los_position(&self) -> Option<f64> {
        self.timeline
            .iter()
            .rev()
            .filter(|e| e.step_type == StepType::LosAdjusted)
            .find_map(|e| e.data.as_ref()?.get("los_position")?.as_f64())
    }
}

/// Row of the experiment list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub timeline_count: usize,
    #[serde(default)]
    pub latest_video: Option<String>,
}

/// Payload persisted when a bound point is released.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundsAdjusted {
    pub top_corners: Vec<Point>,
    pub bottom_corners: Vec<Point>,
    #[serde(default)]
    pub top_bounds: Option<Aabb>,
    #[serde(default)]
    pub bottom_bounds: Option<Aabb>,
}

impl BoundsAdjusted {
    pub fn from_bounds(bounds: &Bounds) -> Self {
        Self {
            top_corners: bounds.top.clone(),
            bottom_corners: bounds.bottom.clone(),
            top_bounds: bounds.aabb(View::Top),
            bottom_bounds: bounds.aabb(View::Bottom),
        }
    }
}

/// State of a long-running backend job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Starting,
    Processing,
    Completed,
    Error,
    NotFound,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Polling stops once one of these is observed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// Progress report from the segmentation progress endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub status: JobStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub current_frame: Option<u64>,
    #[serde(default)]
    pub total_frames: Option<u64>,
    #[serde(default)]
    pub result_url: Option<String>,
}

impl JobProgress {
    pub fn starting(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Starting,
            message: message.into(),
            percent: 0.0,
            current_frame: None,
            total_frames: None,
            result_url: None,
        }
    }
}
