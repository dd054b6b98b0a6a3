// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Session serialization and deserialization.
//!
//! This module handles exporting and importing annotation sessions in
//! YAML and JSON formats, chosen by file extension.

use crate::models::session::SessionData;
use anyhow::{bail, Result};
use std::path::Path;

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|s| s.to_str())
}

/// Export a session, picking YAML or JSON from the extension.
pub fn export_session(data: &SessionData, path: &Path) -> Result<()> {
    let text = match extension(path) {
        Some("yaml") | Some("yml") => serde_yaml::to_string(data)?,
        Some("json") => serde_json::to_string_pretty(data)?,
        other => bail!("Unsupported file extension: {:?}", other),
    };
    std::fs::write(path, text)?;
    Ok(())
}

/// Import a session, picking YAML or JSON from the extension.
pub fn import_session(path: &Path) -> Result<SessionData> {
    let text = std::fs::read_to_string(path)?;
    let data = match extension(path) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&text)?,
        Some("json") => serde_json::from_str(&text)?,
        other => bail!("Unsupported file extension: {:?}", other),
    };
    Ok(data)
}
