// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! HTTP client for the detection backend.
//!
//! Every call is blocking and is meant to run on a background thread.
//! Transport errors and non-success statuses map to
//! [`OverlayError::NetworkFailure`]; bodies that do not decode map to
//! [`OverlayError::ValidationFailure`].

use crate::error::{OverlayError, Result};
use crate::models::bounds::{Bounds, Point};
use crate::models::experiment::JobProgress;
use crate::models::players::{PlayerBox, Players};
use crate::models::session::DetectionMode;
use reqwest::blocking::{multipart, Client, RequestBuilder};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Response of `/upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedVideo {
    pub filename: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Response of `/detect-field-corners`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldCorners {
    pub top_corners: Vec<Point>,
    pub bottom_corners: Vec<Point>,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl FieldCorners {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.top_corners.clone(), self.bottom_corners.clone())
    }
}

/// Request body of `/detect-players`.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerDetectionRequest<'a> {
    pub filename: &'a str,
    pub top_corners: &'a [Point],
    pub bottom_corners: &'a [Point],
    pub detection_mode: DetectionMode,
    pub los_position: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct PlayersResponse {
    #[serde(default)]
    top_players: Vec<PlayerBox>,
    #[serde(default)]
    bottom_players: Vec<PlayerBox>,
    #[serde(default)]
    similarity: f64,
    #[serde(default)]
    metadata: serde_json::Value,
}

/// Request body of the segmentation endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentRequest<'a> {
    pub filename: &'a str,
    pub top_players: &'a [PlayerBox],
    pub bottom_players: &'a [PlayerBox],
}

/// Response of `/segment-first-frame`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SegmentResult {
    pub result_url: String,
    #[serde(default)]
    pub top_player_count: usize,
    #[serde(default)]
    pub bottom_player_count: usize,
}

/// Response of `/segment-full-video`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobStarted {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub output_filename: Option<String>,
}

/// Decode a response body, reporting shape problems as validation failures.
pub fn parse_response<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| OverlayError::validation(endpoint, e))
}

/// Blocking client shared by the detection and timeline calls.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: Url,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| OverlayError::Config(format!("invalid backend url {base_url}: {e}")))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OverlayError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// URL for `segments` below the base URL, each segment percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| OverlayError::Config(format!("backend url cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Send `request` and return the body of a success response.
    pub(crate) fn execute(&self, endpoint: &str, request: RequestBuilder) -> Result<String> {
        let response = request
            .send()
            .map_err(|e| OverlayError::network(endpoint, e))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| OverlayError::network(endpoint, e))?;
        if !status.is_success() {
            return Err(OverlayError::network(endpoint, format!("{status} - {body}")));
        }
        Ok(body)
    }

    /// Send `request` and decode a JSON body from a success response.
    pub(crate) fn send<T: DeserializeOwned>(&self, endpoint: &str, request: RequestBuilder) -> Result<T> {
        let body = self.execute(endpoint, request)?;
        parse_response(endpoint, &body)
    }

    /// Upload a local video file; returns the name the backend stored it under.
    pub fn upload_video(&self, path: &Path) -> Result<UploadedVideo> {
        let endpoint = "/upload";
        let form = multipart::Form::new().file("file", path)?;
        let url = self.endpoint(&["upload"])?;
        self.send(endpoint, self.http.post(url).multipart(form))
    }

    pub fn detect_field_corners(&self, filename: &str) -> Result<FieldCorners> {
        let endpoint = "/detect-field-corners";
        let url = self.endpoint(&["detect-field-corners"])?;
        self.send(endpoint, self.http.post(url).query(&[("filename", filename)]))
    }

    pub fn detect_players(&self, request: &PlayerDetectionRequest<'_>) -> Result<Players> {
        let endpoint = "/detect-players";
        let url = self.endpoint(&["detect-players"])?;
        let response: PlayersResponse = self.send(endpoint, self.http.post(url).json(request))?;
        Ok(Players {
            top: response.top_players,
            bottom: response.bottom_players,
            similarity: response.similarity,
            metadata: response.metadata,
        })
    }

    pub fn segment_first_frame(&self, request: &SegmentRequest<'_>) -> Result<SegmentResult> {
        let endpoint = "/segment-first-frame";
        let url = self.endpoint(&["segment-first-frame"])?;
        self.send(endpoint, self.http.post(url).json(request))
    }

    pub fn segment_full_video(&self, request: &SegmentRequest<'_>) -> Result<JobStarted> {
        let endpoint = "/segment-full-video";
        let url = self.endpoint(&["segment-full-video"])?;
        self.send(endpoint, self.http.post(url).json(request))
    }

    pub fn segment_progress(&self, filename: &str) -> Result<JobProgress> {
        let endpoint = "/segment-progress";
        let url = self.endpoint(&["segment-progress", filename])?;
        self.send(endpoint, self.http.get(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_corners_parse() {
        let body = r#"{
            "top_corners": [{"x": 10, "y": 20}, {"x": 200, "y": 20}, {"x": 200, "y": 500}, {"x": 10, "y": 500}],
            "bottom_corners": [{"x": 12, "y": 560}, {"x": 198, "y": 560}, {"x": 198, "y": 1040}, {"x": 12, "y": 1040}],
            "frame_width": 1920,
            "frame_height": 1080
        }"#;
        let corners: FieldCorners = parse_response("/detect-field-corners", body).unwrap();
        let bounds = corners.bounds();
        assert_eq!(bounds.top[1], Point::new(200.0, 20.0));
        assert_eq!(bounds.bottom.len(), 4);
        assert_eq!(corners.frame_width, 1920);
    }

    #[test]
    fn test_missing_corner_array_is_validation_failure() {
        let body = r#"{"top_corners": [], "frame_width": 10, "frame_height": 10}"#;
        let err = parse_response::<FieldCorners>("/detect-field-corners", body).unwrap_err();
        match err {
            OverlayError::ValidationFailure { endpoint, reason } => {
                assert_eq!(endpoint, "/detect-field-corners");
                assert!(reason.contains("bottom_corners"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_players_default_to_empty() {
        let response: PlayersResponse =
            parse_response("/detect-players", r#"{"top_players": [{"x1": 1, "y1": 2, "x2": 3, "y2": 4, "confidence": 0.5}]}"#)
                .unwrap();
        assert_eq!(response.top_players.len(), 1);
        assert!(response.bottom_players.is_empty());
        assert_eq!(response.similarity, 0.0);
    }

    #[test]
    fn test_player_request_body() {
        let top = [Point::new(1.0, 2.0)];
        let request = PlayerDetectionRequest {
            filename: "clip.mp4",
            top_corners: &top,
            bottom_corners: &[],
            detection_mode: DetectionMode::Los,
            los_position: 0.3,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["detection_mode"], "los");
        assert_eq!(value["los_position"], 0.3);
        assert_eq!(value["top_corners"][0]["x"], 1.0);
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = BackendClient::new("http://localhost:8000/api/", 5).unwrap();
        let url = client.endpoint(&["segment-progress", "my clip.mp4"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/segment-progress/my%20clip.mp4");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(BackendClient::new("not a url", 5), Err(OverlayError::Config(_))));
    }
}
