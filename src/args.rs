// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Command-line arguments.

use crate::app::Startup;
use crate::config::AppConfig;
use clap::Parser;
use std::path::PathBuf;

/// Stereo field-bounds annotation tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings file (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the detection and timeline backend
    #[arg(long, value_name = "URL")]
    pub backend_url: Option<String>,

    /// Experiment that receives timeline entries
    #[arg(long, value_name = "ID")]
    pub experiment: Option<i64>,

    /// Video already uploaded to the backend, by its stored filename
    #[arg(long, value_name = "FILENAME")]
    pub video: Option<String>,

    /// Local image of the video's first frame
    #[arg(long, value_name = "FILE")]
    pub frame: Option<PathBuf>,
}

impl Args {
    /// Override file or default settings with the flags that were given.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(ref url) = self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(id) = self.experiment {
            config.experiment_id = Some(id);
        }
    }

    pub fn startup(&self) -> Startup {
        Startup {
            video: self.video.clone(),
            frame: self.frame.clone(),
        }
    }
}
