// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations: media files, session files and the backend.

pub mod backend;
pub mod jobs;
pub mod media;
pub mod serialization;
pub mod timeline;

#[cfg(test)]
pub(crate) mod fake_backend;
