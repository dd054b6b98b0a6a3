// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types shared by the overlay, the backend clients and local I/O.

use thiserror::Error;

/// Errors raised by overlay geometry and by the external collaborators.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// Degenerate quadrilateral: a zero-length edge or midline.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A request to the detection or timeline backend was rejected.
    #[error("network failure on {endpoint}: {reason}")]
    NetworkFailure { endpoint: String, reason: String },

    /// A response payload did not have the expected shape.
    #[error("malformed response from {endpoint}: {reason}")]
    ValidationFailure { endpoint: String, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OverlayError {
    pub fn network(endpoint: &str, reason: impl ToString) -> Self {
        Self::NetworkFailure {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn validation(endpoint: &str, reason: impl ToString) -> Self {
        Self::ValidationFailure {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OverlayError>;
