// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Experiment timeline persistence.
//!
//! Adjustments are applied locally first and then written through to the
//! timeline backend by a single worker thread, so writes reach the server
//! in the order they were made. Repeated adjustments of the same kind
//! replace the last entry instead of growing the history.

use super::backend::BackendClient;
use crate::error::Result;
use crate::models::experiment::{Experiment, ExperimentSummary, StepType, TimelineEntry};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};

/// Name given to experiments created from the app.
pub const DEFAULT_EXPERIMENT_NAME: &str = "unnamed experiment";

/// How a timeline write lands on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Append,
    ReplaceLast,
}

#[derive(Debug, Serialize)]
struct EntryBody<'a> {
    step_type: StepType,
    data: &'a serde_json::Value,
}

#[derive(Debug, Serialize)]
struct NewExperiment<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExperimentList {
    #[serde(default)]
    experiments: Vec<ExperimentSummary>,
}

impl BackendClient {
    /// All experiments, most recently updated first.
    pub fn list_experiments(&self) -> Result<Vec<ExperimentSummary>> {
        let url = self.endpoint(&["experiments"])?;
        let list: ExperimentList = self.send("/experiments", self.http().get(url))?;
        Ok(list.experiments)
    }

    pub fn create_experiment(&self, name: &str) -> Result<ExperimentSummary> {
        let url = self.endpoint(&["experiments"])?;
        self.send("/experiments", self.http().post(url).json(&NewExperiment { name }))
    }

    /// Delete an experiment with its timeline. The response body is ignored.
    pub fn delete_experiment(&self, experiment_id: i64) -> Result<()> {
        let id = experiment_id.to_string();
        let url = self.endpoint(&["experiments", id.as_str()])?;
        self.execute("/experiments/{id}", self.http().delete(url)).map(|_| ())
    }

    /// Fetch an experiment with its full timeline.
    pub fn fetch_experiment(&self, experiment_id: i64) -> Result<Experiment> {
        let id = experiment_id.to_string();
        let url = self.endpoint(&["experiments", id.as_str()])?;
        self.send("/experiments/{id}", self.http().get(url))
    }

    /// Append an entry to the end of the timeline.
    pub fn append_entry(&self, experiment_id: i64, step_type: StepType, data: &serde_json::Value) -> Result<TimelineEntry> {
        let id = experiment_id.to_string();
        let url = self.endpoint(&["experiments", id.as_str(), "timeline"])?;
        let body = EntryBody { step_type, data };
        self.send("/experiments/{id}/timeline", self.http().post(url).json(&body))
    }

    /// Overwrite the most recent timeline entry.
    pub fn replace_last_entry(&self, experiment_id: i64, step_type: StepType, data: &serde_json::Value) -> Result<TimelineEntry> {
        let id = experiment_id.to_string();
        let url = self.endpoint(&["experiments", id.as_str(), "timeline", "last"])?;
        let body = EntryBody { step_type, data };
        self.send("/experiments/{id}/timeline/last", self.http().put(url).json(&body))
    }
}

/// Decides between append and replace-last for each write, from the step
/// type of the last entry the server confirmed.
#[derive(Debug, Clone, Default)]
pub struct TimelinePlanner {
    last_step: Option<StepType>,
}

impl TimelinePlanner {
    /// Start from the experiment's existing history.
    pub fn from_history(history: &[TimelineEntry]) -> Self {
        Self {
            last_step: history.last().map(|e| e.step_type),
        }
    }

    /// Replace the last entry if it is the same kind of step, append
    /// otherwise.
    pub fn plan(&self, step: StepType) -> WriteMode {
        if self.last_step == Some(step) {
            WriteMode::ReplaceLast
        } else {
            WriteMode::Append
        }
    }

    /// The server now ends with a `step` entry.
    pub fn confirm(&mut self, step: StepType) {
        self.last_step = Some(step);
    }

    /// Forget what the server holds after a failed write, so the next
    /// write appends rather than replacing an unrelated entry.
    pub fn reset(&mut self) {
        self.last_step = None;
    }
}

/// One queued timeline write.
#[derive(Debug, Clone)]
pub struct TimelineWrite {
    pub step: StepType,
    pub data: serde_json::Value,
}

/// Write-through link between local state and one experiment's timeline.
pub struct TimelineSync {
    experiment_id: i64,
    jobs: Sender<TimelineWrite>,
    results: Receiver<(WriteMode, Result<TimelineEntry>)>,
    in_flight: usize,
}

impl TimelineSync {
    /// Spawn the writer thread for `experiment_id`.
    ///
    /// The writer plans each write only once the previous one has
    /// finished, so a failed append is never followed by a replace-last.
    pub fn spawn(client: BackendClient, experiment_id: i64, history: &[TimelineEntry]) -> Self {
        let (jobs, job_receiver) = channel::<TimelineWrite>();
        let (result_sender, results) = channel();
        let mut planner = TimelinePlanner::from_history(history);

        std::thread::spawn(move || {
            // Ends when the sync handle is dropped
            while let Ok(write) = job_receiver.recv() {
                let mode = planner.plan(write.step);
                log::info!("Persisting {:?} to experiment {} ({:?})", write.step, experiment_id, mode);
                let result = match mode {
                    WriteMode::Append => client.append_entry(experiment_id, write.step, &write.data),
                    WriteMode::ReplaceLast => client.replace_last_entry(experiment_id, write.step, &write.data),
                };
                match &result {
                    Ok(_) => planner.confirm(write.step),
                    Err(e) => {
                        log::warn!("Timeline write to experiment {} failed: {}", experiment_id, e);
                        planner.reset();
                    }
                }
                if result_sender.send((mode, result)).is_err() {
                    break;
                }
            }
            log::debug!("Timeline writer for experiment {} stopped", experiment_id);
        });

        Self {
            experiment_id,
            jobs,
            results,
            in_flight: 0,
        }
    }

    pub fn experiment_id(&self) -> i64 {
        self.experiment_id
    }

    /// Whether every queued write has reported back.
    pub fn is_idle(&self) -> bool {
        self.in_flight == 0
    }

    /// Queue a write of `data` as a `step` entry.
    pub fn record(&mut self, step: StepType, data: serde_json::Value) {
        if self.jobs.send(TimelineWrite { step, data }).is_err() {
            log::error!("Timeline writer for experiment {} is gone", self.experiment_id);
        } else {
            self.in_flight += 1;
        }
    }

    /// Collect finished writes with the mode each was sent with. Local
    /// state is never rolled back on failure.
    pub fn poll(&mut self) -> Vec<(WriteMode, Result<TimelineEntry>)> {
        let results: Vec<_> = self.results.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(results.len());
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::backend::parse_response;
    use crate::io::fake_backend::{stored_entry, FakeBackend, Recorded};
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn entry(step_type: StepType) -> TimelineEntry {
        TimelineEntry {
            id: None,
            step_type,
            timestamp: String::new(),
            data: None,
        }
    }

    fn collect(sync: &mut TimelineSync, count: usize) -> Vec<(WriteMode, Result<TimelineEntry>)> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut results = Vec::new();
        while results.len() < count && Instant::now() < deadline {
            results.extend(sync.poll());
            std::thread::sleep(Duration::from_millis(10));
        }
        results
    }

    #[test]
    fn test_repeated_drags_replace_last() {
        let mut planner = TimelinePlanner::from_history(&[entry(StepType::VideoLoaded)]);
        assert_eq!(planner.plan(StepType::BoundsAdjusted), WriteMode::Append);
        planner.confirm(StepType::BoundsAdjusted);
        assert_eq!(planner.plan(StepType::BoundsAdjusted), WriteMode::ReplaceLast);
        planner.confirm(StepType::BoundsAdjusted);
        assert_eq!(planner.plan(StepType::BoundsAdjusted), WriteMode::ReplaceLast);
    }

    #[test]
    fn test_other_step_breaks_replacement() {
        let mut planner = TimelinePlanner::from_history(&[entry(StepType::BoundsAdjusted)]);
        assert_eq!(planner.plan(StepType::BoundsAdjusted), WriteMode::ReplaceLast);
        planner.confirm(StepType::PlayersDetected);
        assert_eq!(planner.plan(StepType::BoundsAdjusted), WriteMode::Append);
    }

    #[test]
    fn test_plan_alone_does_not_advance() {
        let planner = TimelinePlanner::from_history(&[entry(StepType::VideoLoaded)]);
        assert_eq!(planner.plan(StepType::LosAdjusted), WriteMode::Append);
        assert_eq!(planner.plan(StepType::LosAdjusted), WriteMode::Append);
    }

    #[test]
    fn test_reset_after_failure_appends() {
        let mut planner = TimelinePlanner::default();
        planner.confirm(StepType::LosAdjusted);
        planner.reset();
        assert_eq!(planner.plan(StepType::LosAdjusted), WriteMode::Append);
    }

    #[test]
    fn test_failed_append_is_followed_by_append() {
        let server = FakeBackend::start(|index, request| match index {
            0 => (500, json!({"detail": "database locked"})),
            _ => (200, stored_entry(index, request)),
        });
        let client = BackendClient::new(&server.url(), 5).unwrap();
        let mut sync = TimelineSync::spawn(client, 1, &[entry(StepType::VideoLoaded)]);

        let data = json!({"top_corners": [], "bottom_corners": []});
        sync.record(StepType::BoundsAdjusted, data.clone());
        sync.record(StepType::BoundsAdjusted, data.clone());
        sync.record(StepType::BoundsAdjusted, data);

        let results = collect(&mut sync, 3);
        let modes: Vec<_> = results.iter().map(|(mode, _)| *mode).collect();
        assert_eq!(modes, vec![WriteMode::Append, WriteMode::Append, WriteMode::ReplaceLast]);
        assert!(results[0].1.is_err());
        assert!(results[1].1.is_ok());
        assert!(sync.is_idle());

        let routes: Vec<_> = server.requests().iter().map(Recorded::route).collect();
        assert_eq!(
            routes,
            vec![
                "POST /experiments/1/timeline",
                "POST /experiments/1/timeline",
                "PUT /experiments/1/timeline/last",
            ]
        );
    }

    #[test]
    fn test_entry_body_shape() {
        let data = serde_json::json!({"los_position": 0.3});
        let body = EntryBody {
            step_type: StepType::LosAdjusted,
            data: &data,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["step_type"], "los_adjusted");
        assert_eq!(value["data"]["los_position"], 0.3);
    }

    #[test]
    fn test_experiment_list_parse() {
        let body = r#"{"experiments": [
            {"id": 3, "name": "unnamed experiment", "created_at": "2025-03-01T10:00:00",
             "updated_at": "2025-03-01T11:00:00", "timeline_count": 4, "latest_video": "/uploads/clip.mp4"},
            {"id": 2, "name": "old", "timeline_count": 0, "latest_video": null}
        ]}"#;
        let list: ExperimentList = parse_response("/experiments", body).unwrap();
        assert_eq!(list.experiments.len(), 2);
        assert_eq!(list.experiments[0].timeline_count, 4);
        assert_eq!(list.experiments[0].latest_video.as_deref(), Some("/uploads/clip.mp4"));
        assert_eq!(list.experiments[1].latest_video, None);

        let empty: ExperimentList = parse_response("/experiments", "{}").unwrap();
        assert!(empty.experiments.is_empty());
    }

    #[test]
    fn test_created_experiment_needs_id() {
        let created: ExperimentSummary =
            parse_response("/experiments", r#"{"id": 9, "name": "unnamed experiment"}"#).unwrap();
        assert_eq!(created.id, 9);
        assert!(parse_response::<ExperimentSummary>("/experiments", r#"{"name": "x"}"#).is_err());
    }

    #[test]
    fn test_experiment_management_routes() {
        let server = FakeBackend::start(|_, request| match request.method.as_str() {
            "GET" => (200, json!({"experiments": [{"id": 1, "name": "a"}]})),
            "POST" => (200, json!({"id": 2, "name": request.json()["name"]})),
            _ => (200, json!({"success": true})),
        });
        let client = BackendClient::new(&server.url(), 5).unwrap();

        assert_eq!(client.list_experiments().unwrap()[0].id, 1);
        let created = client.create_experiment(DEFAULT_EXPERIMENT_NAME).unwrap();
        assert_eq!(created.id, 2);
        assert_eq!(created.name, "unnamed experiment");
        client.delete_experiment(2).unwrap();

        let requests = server.requests();
        let routes: Vec<_> = requests.iter().map(Recorded::route).collect();
        assert_eq!(routes, vec!["GET /experiments", "POST /experiments", "DELETE /experiments/2"]);
        assert_eq!(requests[1].json(), json!({"name": "unnamed experiment"}));
    }

    #[test]
    fn test_delete_missing_experiment_fails() {
        let server = FakeBackend::start(|_, _| (404, json!({"detail": "Experiment not found"})));
        let client = BackendClient::new(&server.url(), 5).unwrap();
        let err = client.delete_experiment(7).unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
