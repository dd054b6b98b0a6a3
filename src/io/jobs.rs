// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Polling of long-running backend jobs.

use crate::error::Result;
use crate::models::experiment::JobProgress;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::time::Duration;

/// Message from the poller thread.
#[derive(Debug, Clone, PartialEq)]
pub enum PollUpdate {
    Progress(JobProgress),
    /// A single poll failed; polling continues.
    Failed(String),
}

/// Background poller for one job. Dropping it stops the polling.
pub struct ProgressPoller {
    cancelled: Arc<AtomicBool>,
    updates: Receiver<PollUpdate>,
}

impl ProgressPoller {
    /// Call `fetch` every `interval` until it reports a terminal status or
    /// the poller is cancelled.
    pub fn spawn<F>(mut fetch: F, interval: Duration) -> Self
    where
        F: FnMut() -> Result<JobProgress> + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (sender, updates) = channel();
        let flag = Arc::clone(&cancelled);

        std::thread::spawn(move || loop {
            std::thread::sleep(interval);
            if flag.load(Ordering::Relaxed) {
                log::debug!("Progress polling cancelled");
                break;
            }

            let update = match fetch() {
                Ok(progress) => {
                    let terminal = progress.status.is_terminal();
                    if sender.send(PollUpdate::Progress(progress)).is_err() || terminal {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    log::warn!("Error polling progress: {}", e);
                    PollUpdate::Failed(e.to_string())
                }
            };
            if sender.send(update).is_err() {
                break;
            }
        });

        Self { cancelled, updates }
    }

    /// Updates received since the last call.
    pub fn drain(&self) -> Vec<PollUpdate> {
        self.updates.try_iter().collect()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl Drop for ProgressPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OverlayError;
    use crate::models::experiment::JobStatus;

    fn progress(status: JobStatus, percent: f64) -> JobProgress {
        JobProgress {
            status,
            message: String::new(),
            percent,
            current_frame: None,
            total_frames: None,
            result_url: None,
        }
    }

    /// Block until the poller thread exits and return everything it sent.
    fn collect(poller: &ProgressPoller) -> Vec<PollUpdate> {
        poller.updates.iter().collect()
    }

    #[test]
    fn test_stops_on_completed() {
        let mut script = vec![
            Ok(progress(JobStatus::Completed, 100.0)),
            Err(OverlayError::network("/segment-progress", "connection reset")),
            Ok(progress(JobStatus::Processing, 40.0)),
            Ok(progress(JobStatus::Starting, 0.0)),
        ];
        let poller = ProgressPoller::spawn(
            move || script.pop().unwrap_or_else(|| Ok(progress(JobStatus::Processing, 0.0))),
            Duration::from_millis(1),
        );

        let updates = collect(&poller);
        assert_eq!(updates.len(), 4);
        assert!(matches!(updates[2], PollUpdate::Failed(_)));
        assert_eq!(updates[3], PollUpdate::Progress(progress(JobStatus::Completed, 100.0)));
    }

    #[test]
    fn test_stops_on_error_status() {
        let poller = ProgressPoller::spawn(
            || Ok(progress(JobStatus::Error, 10.0)),
            Duration::from_millis(1),
        );
        assert_eq!(collect(&poller).len(), 1);
    }

    #[test]
    fn test_cancel_stops_polling() {
        let poller = ProgressPoller::spawn(
            || Ok(progress(JobStatus::Processing, 1.0)),
            Duration::from_millis(10),
        );
        poller.cancel();
        // The thread exits at its next wake-up; the channel then disconnects
        let updates = collect(&poller);
        assert!(updates.iter().all(|u| matches!(u, PollUpdate::Progress(_))));
    }
}
