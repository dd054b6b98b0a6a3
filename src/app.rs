// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! This module contains the main application structure that implements
//! the egui::App trait. It owns the session, routes pointer input through
//! the drag controller, runs backend requests on background threads and
//! writes adjustments through to the experiment timeline.

use crate::config::AppConfig;
use crate::io::backend::{
    BackendClient, FieldCorners, JobStarted, PlayerDetectionRequest, SegmentRequest, SegmentResult,
};
use crate::io::jobs::{PollUpdate, ProgressPoller};
use crate::io::media::{self, LoadedImage};
use crate::io::serialization;
use crate::io::timeline::{TimelineSync, WriteMode, DEFAULT_EXPERIMENT_NAME};
use crate::models::experiment::{
    BoundsAdjusted, Experiment, ExperimentSummary, JobProgress, JobStatus, StepType, TimelineEntry,
};
use crate::models::players::Players;
use crate::models::session::{DetectionMode, SessionData, ViewMode};
use crate::ui::canvas::{self, CanvasState};
use crate::ui::drag::{DragController, PointerEvent};
use crate::ui::overlay::SceneInput;
use crate::ui::properties::{self, ErrorRecord, PanelData, PropertiesAction};
use crate::ui::toolbar::{self, ToolbarAction, ToolbarState};
use serde::Serialize;
use serde_json::json;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

const MAX_ERRORS: usize = 50;

/// What to open when the window starts.
#[derive(Debug, Clone, Default)]
pub struct Startup {
    /// Video already stored on the backend.
    pub video: Option<String>,
    /// Local image of that video's first frame.
    pub frame: Option<PathBuf>,
}

/// A video with everything fetched for it in the background.
struct LoadedVideo {
    video: String,
    uploaded: bool,
    frame: Option<LoadedImage>,
    experiment: Option<Experiment>,
    /// Detected when the experiment holds no saved bounds
    corners: Option<FieldCorners>,
    warnings: Vec<String>,
}

/// Result of a background backend or file operation.
enum TaskResult {
    VideoReady(LoadedVideo),
    FrameLoaded(LoadedImage),
    ExperimentsListed(Vec<ExperimentSummary>),
    ExperimentOpened(Experiment),
    ExperimentDeleted(i64),
    SessionImported(SessionData),
    BoundsDetected(FieldCorners),
    PlayersDetected(Players),
    FirstFrameSegmented(SegmentResult),
    FullVideoStarted(JobStarted),
    Failed { what: &'static str, error: String },
}

fn failed(what: &'static str, error: impl Display) -> TaskResult {
    TaskResult::Failed {
        what,
        error: format!("{:#}", error),
    }
}

/// First frame of a video, or a still image as is.
fn load_frame(path: &Path) -> anyhow::Result<LoadedImage> {
    if media::is_video(path) {
        media::first_frame(path)
    } else {
        media::load_image(path)
    }
}

/// Fetch the configured experiment, noting a failure instead of aborting.
fn load_experiment(client: &BackendClient, experiment_id: Option<i64>, warnings: &mut Vec<String>) -> Option<Experiment> {
    let id = experiment_id?;
    match client.fetch_experiment(id) {
        Ok(experiment) => {
            log::info!(
                "Loaded experiment {} with {} timeline entries",
                experiment.id,
                experiment.timeline.len()
            );
            Some(experiment)
        }
        Err(e) => {
            warnings.push(format!("Could not load experiment {}: {}", id, e));
            None
        }
    }
}

/// Detect field corners for `video` unless the experiment already has
/// saved bounds.
fn detect_unsaved_bounds(
    client: &BackendClient,
    video: &str,
    experiment: Option<&Experiment>,
    warnings: &mut Vec<String>,
) -> Option<FieldCorners> {
    if let Some(experiment) = experiment.filter(|e| e.latest_bounds().is_some()) {
        log::debug!("Experiment {} has saved bounds; skipping detection", experiment.id);
        return None;
    }
    match client.detect_field_corners(video) {
        Ok(corners) => Some(corners),
        Err(e) => {
            warnings.push(format!("Bound detection failed: {}", e));
            None
        }
    }
}

/// Main application state.
pub struct FieldmarkApp {
    config: AppConfig,

    /// Detection and timeline backend; `None` if the URL was unusable
    client: Option<BackendClient>,

    /// Current session (if a video or frame is loaded)
    session: Option<SessionData>,

    /// First frame texture for display
    frame_texture: Option<egui::TextureHandle>,

    /// Frame dimensions (width, height)
    frame_size: Option<(u32, u32)>,

    canvas: CanvasState,
    drag: DragController,
    detection_mode: DetectionMode,

    /// Write-through link to the experiment timeline
    timeline: Option<TimelineSync>,
    timeline_entries: Vec<TimelineEntry>,

    /// Last fetched experiment list
    experiments: Vec<ExperimentSummary>,
    experiments_requested: bool,

    task_sender: Sender<TaskResult>,
    task_receiver: Receiver<TaskResult>,

    /// Message shown while a background task runs
    busy: Option<String>,

    poller: Option<ProgressPoller>,
    job_progress: Option<JobProgress>,

    /// Segmentation result URLs
    results: Vec<String>,

    error_log: Vec<ErrorRecord>,
    banner: Option<String>,
    diagnostics: Vec<String>,
}

impl FieldmarkApp {
    /// Create a new application instance.
    pub fn new(config: AppConfig, startup: Startup) -> Self {
        let (task_sender, task_receiver) = channel();
        let drag = DragController::new(config.overlay.hit_radius, config.overlay.hover_radius);

        let mut app = Self {
            client: None,
            session: None,
            frame_texture: None,
            frame_size: None,
            canvas: CanvasState::new(),
            drag,
            detection_mode: DetectionMode::default(),
            timeline: None,
            timeline_entries: Vec::new(),
            experiments: Vec::new(),
            experiments_requested: false,
            task_sender,
            task_receiver,
            busy: None,
            poller: None,
            job_progress: None,
            results: Vec::new(),
            error_log: Vec::new(),
            banner: None,
            diagnostics: Vec::new(),
            config,
        };

        match BackendClient::new(&app.config.backend_url, app.config.request_timeout_secs) {
            Ok(client) => {
                log::info!("Backend client for {}", client.base_url());
                app.client = Some(client);
            }
            Err(e) => app.report("Backend setup", e),
        }

        match startup {
            Startup { video: Some(video), frame } => app.attach_video(video, frame),
            Startup { video: None, frame: Some(frame) } => app.open_frame(frame),
            _ => {}
        }

        app
    }

    /// Log a failure and surface it in the banner and error log.
    fn report(&mut self, what: &str, error: impl Display) {
        let message = format!("{}: {}", what, error);
        log::error!("{}", message);
        self.error_log.push(ErrorRecord::now(message.clone()));
        if self.error_log.len() > MAX_ERRORS {
            self.error_log.remove(0);
        }
        self.banner = Some(message);
    }

    /// Run `task` on a background thread; its result is picked up in `update`.
    fn spawn_task<F>(&mut self, message: &str, task: F)
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        if let Some(ref current) = self.busy {
            log::warn!("Ignoring \"{}\" while busy: {}", message, current);
            self.banner = Some(format!("Still working ({}); ignored: {}", current, message));
            return;
        }
        self.busy = Some(message.to_string());
        let sender = self.task_sender.clone();
        std::thread::spawn(move || {
            let _ = sender.send(task());
        });
    }

    fn client(&mut self, what: &str) -> Option<BackendClient> {
        let client = self.client.clone();
        if client.is_none() {
            self.report(what, "no backend configured");
        }
        client
    }

    /// Persist `data` as a `step` entry if an experiment is attached.
    fn persist<T: Serialize>(&mut self, step: StepType, data: &T) {
        let data = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                self.report("Timeline", e);
                return;
            }
        };
        match self.timeline.as_mut() {
            Some(sync) => sync.record(step, data),
            None => log::debug!("No experiment attached; {:?} kept local", step),
        }
    }

    /// Upload a local video, then open its first frame and experiment.
    fn upload_video(&mut self, path: PathBuf) {
        let Some(client) = self.client("Upload") else {
            return;
        };
        let experiment_id = self.config.experiment_id;

        self.spawn_task("Uploading video...", move || {
            let uploaded = match client.upload_video(&path) {
                Ok(uploaded) => uploaded,
                Err(e) => return failed("Upload", e),
            };
            log::info!("Uploaded {} as {}", path.display(), uploaded.filename);

            let mut warnings = Vec::new();
            let frame = match media::first_frame(&path) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    warnings.push(format!("First frame unavailable: {:#}", e));
                    None
                }
            };
            let experiment = load_experiment(&client, experiment_id, &mut warnings);
            let corners = detect_unsaved_bounds(&client, &uploaded.filename, experiment.as_ref(), &mut warnings);

            TaskResult::VideoReady(LoadedVideo {
                video: uploaded.filename,
                uploaded: true,
                frame,
                experiment,
                corners,
                warnings,
            })
        });
    }

    /// Resume work on a video the backend already has.
    fn attach_video(&mut self, video: String, frame_path: Option<PathBuf>) {
        let Some(client) = self.client("Open video") else {
            return;
        };
        let experiment_id = self.config.experiment_id;

        self.spawn_task("Loading experiment...", move || {
            let mut warnings = Vec::new();
            let frame = frame_path.and_then(|path| match load_frame(&path) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    warnings.push(format!("{:#}", e));
                    None
                }
            });
            let experiment = load_experiment(&client, experiment_id, &mut warnings);
            let corners = detect_unsaved_bounds(&client, &video, experiment.as_ref(), &mut warnings);

            TaskResult::VideoReady(LoadedVideo {
                video,
                uploaded: false,
                frame,
                experiment,
                corners,
                warnings,
            })
        });
    }

    fn refresh_experiments(&mut self) {
        let Some(client) = self.client("Experiments") else {
            return;
        };
        self.spawn_task("Loading experiments...", move || match client.list_experiments() {
            Ok(list) => TaskResult::ExperimentsListed(list),
            Err(e) => failed("Experiments", e),
        });
    }

    fn open_experiment(&mut self, experiment_id: i64) {
        let Some(client) = self.client("Open experiment") else {
            return;
        };
        self.spawn_task("Opening experiment...", move || match client.fetch_experiment(experiment_id) {
            Ok(experiment) => TaskResult::ExperimentOpened(experiment),
            Err(e) => failed("Open experiment", e),
        });
    }

    fn create_experiment(&mut self) {
        let Some(client) = self.client("New experiment") else {
            return;
        };
        self.spawn_task("Creating experiment...", move || {
            let created = match client.create_experiment(DEFAULT_EXPERIMENT_NAME) {
                Ok(created) => created,
                Err(e) => return failed("New experiment", e),
            };
            log::info!("Created experiment {}", created.id);
            match client.fetch_experiment(created.id) {
                Ok(experiment) => TaskResult::ExperimentOpened(experiment),
                Err(e) => failed("Open experiment", e),
            }
        });
    }

    fn delete_experiment(&mut self, experiment_id: i64) {
        let Some(client) = self.client("Delete experiment") else {
            return;
        };
        self.spawn_task("Deleting experiment...", move || match client.delete_experiment(experiment_id) {
            Ok(()) => TaskResult::ExperimentDeleted(experiment_id),
            Err(e) => failed("Delete experiment", e),
        });
    }

    /// Write further adjustments to `experiment` and restore its saved
    /// bounds and LOS position into the open session.
    fn attach_experiment(&mut self, experiment: Experiment) {
        if let Some(ref mut session) = self.session {
            if let Some(bounds) = experiment.latest_bounds() {
                log::info!("Restored field bounds from experiment {}", experiment.id);
                session.bounds = bounds;
                self.drag.reset();
            }
            if let Some(t) = experiment.latest_los_position() {
                session.set_los_position(t);
            }
            self.canvas.invalidate();
        }
        self.config.experiment_id = Some(experiment.id);
        self.timeline = self
            .client
            .clone()
            .map(|client| TimelineSync::spawn(client, experiment.id, &experiment.timeline));
        self.timeline_entries = experiment.timeline;
    }

    /// Stop writing through; later changes stay local.
    fn detach_experiment(&mut self) {
        if let Some(sync) = self.timeline.take() {
            log::info!("Detached from experiment {}", sync.experiment_id());
        }
        self.timeline_entries.clear();
    }

    /// Load a frame image to show behind the overlay.
    fn open_frame(&mut self, path: PathBuf) {
        self.spawn_task("Loading frame...", move || match load_frame(&path) {
            Ok(frame) => {
                log::info!("Loaded image: {} ({}x{})", path.display(), frame.width, frame.height);
                TaskResult::FrameLoaded(frame)
            }
            Err(e) => failed("Open frame", e),
        });
    }

    fn import_session(&mut self, path: PathBuf) {
        self.spawn_task("Loading session...", move || match serialization::import_session(&path) {
            Ok(data) => {
                log::info!("Imported session for {} from {}", data.video, path.display());
                TaskResult::SessionImported(data)
            }
            Err(e) => failed("Import session", e),
        });
    }

    fn export_session(&mut self, path: PathBuf) {
        let Some(ref session) = self.session else {
            return;
        };
        match serialization::export_session(session, &path) {
            Ok(_) => log::info!("Exported session to {}", path.display()),
            Err(e) => self.report("Export session", e),
        }
    }

    fn detect_bounds(&mut self) {
        let Some(video) = self.session.as_ref().map(|s| s.video.clone()) else {
            return;
        };
        let Some(client) = self.client("Bound detection") else {
            return;
        };
        self.spawn_task("Detecting field corners...", move || {
            match client.detect_field_corners(&video) {
                Ok(corners) => TaskResult::BoundsDetected(corners),
                Err(e) => failed("Bound detection", e),
            }
        });
    }

    fn detect_players(&mut self) {
        let Some(ref session) = self.session else {
            return;
        };
        let filename = session.video.clone();
        let top = session.bounds.top.clone();
        let bottom = session.bounds.bottom.clone();
        let los_position = session.los_position;
        let detection_mode = self.detection_mode;
        let Some(client) = self.client("Player detection") else {
            return;
        };

        self.spawn_task("Detecting players...", move || {
            let request = PlayerDetectionRequest {
                filename: &filename,
                top_corners: &top,
                bottom_corners: &bottom,
                detection_mode,
                los_position,
            };
            match client.detect_players(&request) {
                Ok(players) => TaskResult::PlayersDetected(players),
                Err(e) => failed("Player detection", e),
            }
        });
    }

    fn segment(&mut self, full_video: bool) {
        let Some(ref session) = self.session else {
            return;
        };
        let filename = session.video.clone();
        let top = session.players.top.clone();
        let bottom = session.players.bottom.clone();
        let Some(client) = self.client("Segmentation") else {
            return;
        };

        let message = if full_video {
            "Starting video segmentation..."
        } else {
            "Segmenting first frame..."
        };
        self.spawn_task(message, move || {
            let request = SegmentRequest {
                filename: &filename,
                top_players: &top,
                bottom_players: &bottom,
            };
            if full_video {
                match client.segment_full_video(&request) {
                    Ok(job) => TaskResult::FullVideoStarted(job),
                    Err(e) => failed("Video segmentation", e),
                }
            } else {
                match client.segment_first_frame(&request) {
                    Ok(result) => TaskResult::FirstFrameSegmented(result),
                    Err(e) => failed("Frame segmentation", e),
                }
            }
        });
    }

    fn set_frame(&mut self, ctx: &egui::Context, frame: LoadedImage) {
        let size = [frame.width as usize, frame.height as usize];
        let image = egui::ColorImage::from_rgba_unmultiplied(size, &frame.pixels);
        match self.frame_texture {
            Some(ref mut texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.frame_texture = Some(ctx.load_texture("video_frame", image, egui::TextureOptions::LINEAR));
            }
        }
        self.frame_size = Some((frame.width, frame.height));

        match self.session {
            Some(ref mut session) => {
                if (session.frame_width, session.frame_height) != (frame.width, frame.height) {
                    log::warn!(
                        "Frame is {}x{}, session was {}x{}",
                        frame.width,
                        frame.height,
                        session.frame_width,
                        session.frame_height
                    );
                    session.frame_width = frame.width;
                    session.frame_height = frame.height;
                }
            }
            None => {
                self.session = Some(SessionData::new(
                    String::new(),
                    frame.width,
                    frame.height,
                    self.config.overlay.default_los_position,
                ));
            }
        }
        self.canvas.invalidate();
    }

    /// Drop everything tied to the previous video.
    fn reset_workflow(&mut self) {
        self.poller = None;
        self.job_progress = None;
        self.results.clear();
        self.diagnostics.clear();
        self.drag.reset();
        self.canvas.clear();
    }

    fn apply_video(&mut self, ctx: &egui::Context, loaded: LoadedVideo) {
        let LoadedVideo {
            video,
            uploaded,
            frame,
            experiment,
            corners,
            warnings,
        } = loaded;

        // An old frame only stays up for the same video, or if it was
        // opened before any video
        let keep_frame = self
            .session
            .as_ref()
            .is_some_and(|s| s.video.is_empty() || s.video == video);
        self.reset_workflow();
        if frame.is_none() && !keep_frame {
            self.frame_texture = None;
            self.frame_size = None;
        }

        let (width, height) = frame
            .as_ref()
            .map(|f| (f.width, f.height))
            .or(self.frame_size)
            .unwrap_or((0, 0));
        self.session = Some(SessionData::new(
            video.clone(),
            width,
            height,
            self.config.overlay.default_los_position,
        ));
        match experiment {
            Some(experiment) => self.attach_experiment(experiment),
            None => self.detach_experiment(),
        }
        if let Some(frame) = frame {
            self.set_frame(ctx, frame);
        }

        let mut detected = None;
        if let (Some(corners), Some(session)) = (corners, self.session.as_mut()) {
            if session.bounds.is_empty() {
                session.bounds = corners.bounds();
                if session.frame_width == 0 || session.frame_height == 0 {
                    session.frame_width = corners.frame_width;
                    session.frame_height = corners.frame_height;
                }
                log::info!("Detected field bounds for {}", video);
                detected = Some(BoundsAdjusted::from_bounds(&session.bounds));
            }
        }
        log::info!("Video {} ready", video);

        if uploaded {
            self.persist(StepType::VideoLoaded, &json!({ "video_name": video }));
        }
        if let Some(payload) = detected {
            self.persist(StepType::BoundsAdjusted, &payload);
        }
        for warning in warnings {
            self.report("Video", warning);
        }
    }

    fn handle_task(&mut self, ctx: &egui::Context, result: TaskResult) {
        match result {
            TaskResult::VideoReady(loaded) => self.apply_video(ctx, loaded),
            TaskResult::FrameLoaded(frame) => self.set_frame(ctx, frame),
            TaskResult::ExperimentsListed(list) => {
                log::info!("{} experiments on the backend", list.len());
                self.experiments = list;
            }
            TaskResult::ExperimentOpened(experiment) => {
                log::info!(
                    "Opened experiment {} with {} timeline entries",
                    experiment.id,
                    experiment.timeline.len()
                );
                self.attach_experiment(experiment);
            }
            TaskResult::ExperimentDeleted(id) => {
                log::info!("Deleted experiment {}", id);
                self.experiments.retain(|e| e.id != id);
                if self.timeline.as_ref().is_some_and(|t| t.experiment_id() == id) {
                    self.detach_experiment();
                }
                if self.config.experiment_id == Some(id) {
                    self.config.experiment_id = None;
                }
            }
            TaskResult::SessionImported(data) => {
                let same_video = self.session.as_ref().is_some_and(|s| s.video == data.video);
                if !same_video {
                    self.detach_experiment();
                }
                self.reset_workflow();
                if let Some((width, height)) = self.frame_size {
                    if (data.frame_width, data.frame_height) != (width, height) {
                        log::warn!(
                            "Imported session is {}x{} but the open frame is {}x{}",
                            data.frame_width,
                            data.frame_height,
                            width,
                            height
                        );
                    }
                }
                self.session = Some(data);
            }
            TaskResult::BoundsDetected(corners) => {
                let Some(ref mut session) = self.session else {
                    return;
                };
                session.bounds = corners.bounds();
                if session.frame_width == 0 || session.frame_height == 0 {
                    session.frame_width = corners.frame_width;
                    session.frame_height = corners.frame_height;
                }
                let payload = BoundsAdjusted::from_bounds(&session.bounds);
                log::info!(
                    "Detected {} top and {} bottom corners",
                    corners.top_corners.len(),
                    corners.bottom_corners.len()
                );
                self.drag.reset();
                self.canvas.invalidate();
                self.persist(StepType::BoundsAdjusted, &payload);
            }
            TaskResult::PlayersDetected(players) => {
                let Some(ref mut session) = self.session else {
                    return;
                };
                let payload = json!({
                    "top_count": players.top.len(),
                    "bottom_count": players.bottom.len(),
                    "similarity": players.similarity,
                    "detection_mode": self.detection_mode,
                    "los_position": session.los_position,
                });
                log::info!(
                    "Detected {} top and {} bottom players",
                    players.top.len(),
                    players.bottom.len()
                );
                session.players = players;
                self.canvas.invalidate();
                self.persist(StepType::PlayersDetected, &payload);
            }
            TaskResult::FirstFrameSegmented(result) => {
                log::info!("First frame segmented: {}", result.result_url);
                self.results.push(result.result_url.clone());
                self.persist(StepType::SegmentationCompleted, &result_payload(&result));
            }
            TaskResult::FullVideoStarted(job) => self.start_polling(job),
            TaskResult::Failed { what, error } => self.report(what, error),
        }
    }

    fn start_polling(&mut self, job: JobStarted) {
        let (Some(client), Some(session)) = (self.client.clone(), self.session.as_ref()) else {
            return;
        };
        let filename = session.video.clone();
        log::info!("Segmentation job for {} started: {}", filename, job.status);

        self.job_progress = Some(JobProgress::starting(job.message));
        self.poller = Some(ProgressPoller::spawn(
            move || client.segment_progress(&filename),
            Duration::from_millis(self.config.poll_interval_ms),
        ));
    }

    fn poll_background(&mut self, ctx: &egui::Context) {
        while let Ok(result) = self.task_receiver.try_recv() {
            self.busy = None;
            self.handle_task(ctx, result);
        }

        let mut write_failures = Vec::new();
        if let Some(ref mut sync) = self.timeline {
            for (mode, result) in sync.poll() {
                match (mode, result) {
                    (WriteMode::ReplaceLast, Ok(entry)) => match self.timeline_entries.last_mut() {
                        Some(last) => *last = entry,
                        None => self.timeline_entries.push(entry),
                    },
                    (WriteMode::Append, Ok(entry)) => self.timeline_entries.push(entry),
                    (_, Err(e)) => write_failures.push(e),
                }
            }
        }
        for e in write_failures {
            self.report("Timeline", e);
        }

        let updates = self.poller.as_ref().map(|p| p.drain()).unwrap_or_default();
        for update in updates {
            match update {
                PollUpdate::Progress(progress) => self.apply_progress(progress),
                PollUpdate::Failed(reason) => log::debug!("Progress poll failed: {}", reason),
            }
        }
    }

    fn apply_progress(&mut self, progress: JobProgress) {
        match progress.status {
            JobStatus::Completed => {
                self.poller = None;
                log::info!("Video segmentation completed");
                if let Some(ref url) = progress.result_url {
                    self.results.push(url.clone());
                    let (top, bottom) = self
                        .session
                        .as_ref()
                        .map(|s| (s.players.top.len(), s.players.bottom.len()))
                        .unwrap_or_default();
                    let payload = json!({
                        "result_url": url,
                        "top_player_count": top,
                        "bottom_player_count": bottom,
                        "full_video": true,
                    });
                    self.persist(StepType::SegmentationCompleted, &payload);
                }
            }
            JobStatus::Error => {
                self.poller = None;
                self.report("Video segmentation", &progress.message);
            }
            _ => {}
        }
        self.job_progress = Some(progress);
    }

    fn set_view_mode(&mut self, mode: ViewMode) {
        if let Some(ref mut session) = self.session {
            if session.view_mode != mode {
                log::info!("Player view mode: {}", mode.label());
                session.view_mode = mode;
                self.canvas.invalidate();
            }
        }
    }

    fn move_los(&mut self, position: f64, committed: bool) {
        let Some(ref mut session) = self.session else {
            return;
        };
        if session.set_los_position(position) {
            self.canvas.invalidate();
        }
        if committed {
            let payload = json!({ "los_position": session.los_position });
            self.persist(StepType::LosAdjusted, &payload);
        }
    }

    /// Feed canvas pointer events through the drag controller.
    fn handle_pointer(&mut self, events: Vec<PointerEvent>) -> bool {
        let Some(ref mut session) = self.session else {
            return false;
        };

        let mut redraw = false;
        let mut finished = None;
        for event in events {
            let outcome = self.drag.handle(event, &mut session.bounds);
            redraw |= outcome.bounds_changed || outcome.hover_changed;
            if let Some(drag) = outcome.finished.filter(|d| d.moved) {
                finished = Some(drag);
            }
        }
        if redraw {
            self.canvas.invalidate();
        }

        if let Some(drag) = finished {
            if let Some(point) = session.bounds.get(drag.target) {
                log::info!("Moved {} to ({}, {})", drag.target.label(), point.x, point.y);
            }
            let payload = BoundsAdjusted::from_bounds(&session.bounds);
            self.persist(StepType::BoundsAdjusted, &payload);
        }
        redraw
    }

    fn status_line(&self) -> String {
        let Some(ref session) = self.session else {
            return String::new();
        };
        let mut parts = Vec::new();
        if !session.video.is_empty() {
            parts.push(session.video.clone());
        }
        parts.push(format!("{} × {}", session.frame_width, session.frame_height));
        parts.push(format!("LOS {:.3}", session.los_position));
        if let Some(drag) = self.drag.dragging() {
            parts.push(format!("dragging {}", drag.target.label()));
        } else if let Some(hover) = self.drag.hovered() {
            parts.push(format!("hover {}", hover.label()));
        }
        parts.join("  |  ")
    }

    fn show_menu(&mut self, ctx: &egui::Context) {
        let idle = self.busy.is_none();
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.add_enabled(idle, egui::Button::new("Upload Video...")).clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Videos", &["mp4", "mov", "avi", "mkv", "webm"])
                            .pick_file()
                        {
                            self.upload_video(path);
                        }
                        ui.close_menu();
                    }
                    if ui.add_enabled(idle, egui::Button::new("Open Frame Image...")).clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Images", &["jpg", "jpeg", "png", "bmp", "tiff", "tif"])
                            .add_filter("Videos", &["mp4", "mov", "avi", "mkv", "webm"])
                            .pick_file()
                        {
                            self.open_frame(path);
                        }
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.add_enabled(idle, egui::Button::new("Import Session...")).clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Session", &["yaml", "yml", "json"])
                            .pick_file()
                        {
                            self.import_session(path);
                        }
                        ui.close_menu();
                    }
                    ui.add_enabled_ui(self.session.is_some(), |ui| {
                        ui.menu_button("Export Session", |ui| {
                            if ui.button("Export as YAML...").clicked() {
                                if let Some(path) = rfd::FileDialog::new()
                                    .add_filter("YAML", &["yaml", "yml"])
                                    .set_file_name("session.yaml")
                                    .save_file()
                                {
                                    self.export_session(path);
                                }
                                ui.close_menu();
                            }
                            if ui.button("Export as JSON...").clicked() {
                                if let Some(path) = rfd::FileDialog::new()
                                    .add_filter("JSON", &["json"])
                                    .set_file_name("session.json")
                                    .save_file()
                                {
                                    self.export_session(path);
                                }
                                ui.close_menu();
                            }
                        });
                    });
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Experiment", |ui| self.show_experiment_menu(ui, idle));

                ui.menu_button("View", |ui| {
                    let current = self.session.as_ref().map(|s| s.view_mode);
                    for mode in ViewMode::ALL {
                        if ui
                            .add_enabled(
                                current.is_some(),
                                egui::SelectableLabel::new(current == Some(mode), mode.label()),
                            )
                            .clicked()
                        {
                            self.set_view_mode(mode);
                            ui.close_menu();
                        }
                    }
                });
            });
        });
    }

    fn show_experiment_menu(&mut self, ui: &mut egui::Ui, idle: bool) {
        // First opening of the menu loads the list
        if idle && !self.experiments_requested {
            self.experiments_requested = true;
            self.refresh_experiments();
        }

        let current = self.timeline.as_ref().map(|t| t.experiment_id());
        match current {
            Some(id) => ui.label(format!("Attached to experiment {}", id)),
            None => ui.weak("No experiment attached"),
        };
        ui.separator();

        if ui.add_enabled(idle, egui::Button::new("New Experiment")).clicked() {
            self.create_experiment();
            ui.close_menu();
        }
        if ui.add_enabled(idle, egui::Button::new("Refresh List")).clicked() {
            self.refresh_experiments();
        }

        if self.experiments.is_empty() {
            ui.weak("No experiments listed");
        }
        let mut open = None;
        for experiment in &self.experiments {
            let mut label = format!("#{} {} ({} steps)", experiment.id, experiment.name, experiment.timeline_count);
            if experiment.latest_video.is_some() {
                label.push_str(" 📹");
            }
            let selected = current == Some(experiment.id);
            if ui
                .add_enabled(idle, egui::SelectableLabel::new(selected, label))
                .clicked()
            {
                open = Some(experiment.id);
            }
        }
        if let Some(id) = open {
            self.open_experiment(id);
            ui.close_menu();
        }

        ui.separator();
        if let Some(id) = current {
            if ui.add_enabled(idle, egui::Button::new("Detach")).clicked() {
                self.detach_experiment();
                self.config.experiment_id = None;
                ui.close_menu();
            }
            if ui
                .add_enabled(idle, egui::Button::new(format!("Delete Experiment {}", id)))
                .clicked()
            {
                self.delete_experiment(id);
                ui.close_menu();
            }
        }
    }
}

fn result_payload(result: &SegmentResult) -> serde_json::Value {
    json!({
        "result_url": result.result_url,
        "top_player_count": result.top_player_count,
        "bottom_player_count": result.bottom_player_count,
    })
}

impl eframe::App for FieldmarkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_background(ctx);

        let timeline_pending = self.timeline.as_ref().is_some_and(|t| !t.is_idle());
        if self.busy.is_some() || self.poller.is_some() || timeline_pending {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.banner = None;
        }

        self.show_menu(ctx);

        // Latest error, dismissible
        if let Some(message) = self.banner.clone() {
            egui::TopBottomPanel::top("error_banner").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(egui::Color32::from_rgb(230, 90, 90), format!("⚠ {}", message));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("✖").clicked() {
                            self.banner = None;
                        }
                    });
                });
            });
        }

        // Toolbar
        let toolbar_state = ToolbarState {
            has_video: self.session.as_ref().is_some_and(|s| !s.video.is_empty()),
            bounds_ready: self.session.as_ref().is_some_and(|s| !s.bounds.is_empty()),
            has_players: self.session.as_ref().is_some_and(|s| !s.players.is_empty()),
            busy: self.busy.is_some(),
            job_running: self.poller.is_some(),
            view_mode: self.session.as_ref().map(|s| s.view_mode).unwrap_or_default(),
            detection_mode: self.detection_mode,
            los_position: self
                .session
                .as_ref()
                .map_or(self.config.overlay.default_los_position, |s| s.los_position),
        };
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| toolbar::show(ui, &toolbar_state))
            .inner;

        match toolbar_action {
            ToolbarAction::DetectBounds => self.detect_bounds(),
            ToolbarAction::DetectPlayers => self.detect_players(),
            ToolbarAction::SegmentFirstFrame => self.segment(false),
            ToolbarAction::SegmentFullVideo => self.segment(true),
            ToolbarAction::SetViewMode(mode) => self.set_view_mode(mode),
            ToolbarAction::SetDetectionMode(mode) => self.detection_mode = mode,
            ToolbarAction::MoveLos { position, committed } => self.move_los(position, committed),
            ToolbarAction::None => {}
        }

        // Properties panel (right side)
        let properties_action = egui::SidePanel::right("properties")
            .default_width(280.0)
            .show(ctx, |ui| {
                let data = PanelData {
                    session: self.session.as_ref(),
                    experiment_id: self.timeline.as_ref().map(|t| t.experiment_id()),
                    timeline: &self.timeline_entries,
                    job: self.job_progress.as_ref(),
                    job_running: self.poller.is_some(),
                    results: &self.results,
                    errors: &self.error_log,
                    diagnostics: &self.diagnostics,
                };
                properties::show(ui, &data)
            })
            .inner;

        match properties_action {
            PropertiesAction::CancelJob => {
                if let Some(poller) = self.poller.take() {
                    poller.cancel();
                    log::info!("Stopped polling segmentation progress");
                }
            }
            PropertiesAction::ClearErrors => {
                self.error_log.clear();
                self.banner = None;
            }
            PropertiesAction::None => {}
        }

        // Redraw the overlay layer from scratch if anything changed
        if let (Some(session), Some(size)) = (self.session.as_ref(), self.frame_size) {
            let input = SceneInput {
                bounds: &session.bounds,
                hover: self.drag.hovered(),
                los_position: session.los_position,
                players: &session.players,
                view_mode: session.view_mode,
            };
            if let Some(diagnostics) = self.canvas.refresh(ctx, &input, &self.config.overlay, size) {
                self.diagnostics = diagnostics;
            }
        }

        // Main canvas (center)
        let status = self.status_line();
        let events = egui::CentralPanel::default()
            .show(ctx, |ui| {
                if let Some(ref message) = self.busy {
                    if self.frame_texture.is_none() {
                        ui.centered_and_justified(|ui| {
                            ui.vertical_centered(|ui| {
                                ui.add_space(20.0);
                                ui.spinner();
                                ui.add_space(10.0);
                                ui.label(
                                    egui::RichText::new(message)
                                        .size(16.0)
                                        .color(egui::Color32::from_gray(200)),
                                );
                            });
                        });
                        return Vec::new();
                    }
                }
                let status = match self.busy {
                    Some(ref message) => format!("{}  |  {}", status, message),
                    None => status,
                };
                canvas::show(ui, &mut self.canvas, &self.frame_texture, self.frame_size, &status)
            })
            .inner;

        if self.handle_pointer(events) {
            ctx.request_repaint();
        }
    }
}
