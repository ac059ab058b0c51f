// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Errors from talking to the companion backend.
//!
//! Nothing here ever reaches the presentation layer: the trackers catch every
//! `BackendError` at the call site and turn it into a log line.

/// Backend call failure.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend has no record for the subject (HTTP 404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Whether this is the distinguished "nothing configured" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

/// Result type alias for backend calls
pub type Result<T> = std::result::Result<T, BackendError>;
