// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media file loading (frames and videos).
//!
//! This module loads the frame shown behind the overlay and converts it
//! to RGBA pixels suitable for display in egui.

use anyhow::{Context, Result};
use std::path::Path;

/// Decoded RGBA frame.
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Load a still image (typically the first frame of the video).
pub fn load_image(path: &Path) -> Result<LoadedImage> {
    let img = image::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?
        .to_rgba8();
    Ok(LoadedImage {
        width: img.width(),
        height: img.height(),
        pixels: img.into_raw(),
    })
}

/// Whether `path` looks like a video rather than a still image.
pub fn is_video(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .as_deref(),
        Some("mp4" | "mov" | "avi" | "mkv" | "webm")
    )
}

/// Grab the first frame of a video file.
#[cfg(feature = "video-opencv")]
pub fn first_frame(path: &Path) -> Result<LoadedImage> {
    use opencv::{core::Mat, imgproc, prelude::*, videoio};

    let mut capture = videoio::VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)
        .with_context(|| format!("Failed to open video {}", path.display()))?;
    let mut frame = Mat::default();
    if !capture.read(&mut frame)? || frame.empty() {
        anyhow::bail!("No frames in {}", path.display());
    }

    let mut rgba = Mat::default();
    imgproc::cvt_color(&frame, &mut rgba, imgproc::COLOR_BGR2RGBA, 0)?;

    Ok(LoadedImage {
        width: rgba.cols() as u32,
        height: rgba.rows() as u32,
        pixels: rgba.data_bytes()?.to_vec(),
    })
}

/// Grab the first frame of a video file.
#[cfg(not(feature = "video-opencv"))]
pub fn first_frame(path: &Path) -> Result<LoadedImage> {
    anyhow::bail!(
        "Cannot decode {} without the video-opencv feature; open an exported frame instead",
        path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_video() {
        assert!(is_video(Path::new("clips/snap.MP4")));
        assert!(!is_video(Path::new("clips/snap.png")));
        assert!(!is_video(Path::new("clips/snap")));
    }

    #[test]
    fn test_load_image_rgba() {
        let path = std::env::temp_dir().join(format!("fieldmark-frame-{}.png", std::process::id()));
        image::RgbImage::from_pixel(4, 2, image::Rgb([10, 20, 30])).save(&path).unwrap();

        let loaded = load_image(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!((loaded.width, loaded.height), (4, 2));
        assert_eq!(loaded.pixels.len(), 4 * 2 * 4);
        assert_eq!(&loaded.pixels[..4], &[10, 20, 30, 255]);
    }
}
