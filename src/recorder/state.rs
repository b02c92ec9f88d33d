//! Recording state management
//!
//! Defines the capture session state machine and flush errors.

use crate::artifact::ArtifactError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current state of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Frames accumulate into the live buffer
    #[default]
    Streaming,
    /// A drained batch is being written; new frames still accumulate
    Flushing,
}

/// Flush errors
#[derive(Error, Debug)]
pub enum FlushError {
    #[error("Failed to write artifact: {0}")]
    IoFailure(#[from] std::io::Error),

    #[error("Failed to encode frames: {0}")]
    SerializationFailure(#[from] serde_json::Error),

    #[error("A flush is already in progress")]
    ConcurrentFlushRejected,

    #[error("Flush task interrupted: {0}")]
    Interrupted(String),
}

impl From<ArtifactError> for FlushError {
    fn from(e: ArtifactError) -> Self {
        match e {
            ArtifactError::Io(e) => FlushError::IoFailure(e),
            ArtifactError::Json(e) => FlushError::SerializationFailure(e),
            ArtifactError::NameExhausted(stem) => FlushError::IoFailure(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("no free artifact name for {}", stem),
            )),
        }
    }
}

impl From<FlushError> for String {
    fn from(e: FlushError) -> String {
        e.to_string()
    }
}

/// Result of a completed flush, as reported to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushSummary {
    /// Path of the written artifact
    pub artifact_path: String,

    /// Buffer epoch the frames belonged to
    pub epoch: u64,

    /// Number of frames written
    pub frame_count: usize,

    /// Whether the session-reset signal was delivered
    pub session_reset: bool,
}
