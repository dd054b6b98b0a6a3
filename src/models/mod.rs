// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data models for the field bounds overlay.

pub mod bounds;
pub mod experiment;
pub mod players;
pub mod session;
