// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! fieldmark - stereo field bounds annotation
//!
//! A cross-platform desktop application for adjusting the field bounds of
//! stacked stereo football video, with a tapered line-of-scrimmage overlay
//! and player detection and segmentation through a detection backend.

mod app;
mod args;
mod config;
mod error;
mod io;
mod models;
mod ui;
mod util;

use anyhow::{Context, Result};
use app::FieldmarkApp;
use args::Args;
use clap::Parser;
use config::AppConfig;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();
    let mut config = match args.config {
        Some(ref path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;
    log::info!("Using backend at {}", config.backend_url);

    let startup = args.startup();

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title("fieldmark - Field Bounds Overlay"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "fieldmark",
        options,
        Box::new(move |_cc| Ok(Box::new(FieldmarkApp::new(config, startup)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
