//! Recording-related host commands
//!
//! Thin wrappers the host UI calls; they turn pipeline results into
//! serializable responses.

use crate::recorder::{FlushSummary, SessionState};
use crate::source::{CaptureSession, StreamingSource};
use crate::utils::{AppError, AppResult, ErrorResponse};
use serde::{Deserialize, Serialize};

/// Host state for recording
pub struct RecorderState<S: StreamingSource + 'static> {
    pub session: CaptureSession<S>,
}

impl<S: StreamingSource + 'static> RecorderState<S> {
    pub fn new(session: CaptureSession<S>) -> Self {
        Self { session }
    }
}

/// Buffer and ingestion counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferStats {
    pub state: SessionState,
    pub epoch: u64,
    pub buffered_frames: usize,
    pub accepted_frames: u64,
    pub dropped_frames: u64,
}

/// Flush everything recorded so far and restart the session
pub async fn flush_recording<S: StreamingSource + 'static>(
    state: &RecorderState<S>,
) -> Result<FlushSummary, ErrorResponse> {
    state.session.flush().await.map_err(ErrorResponse::from)
}

/// Get current session state
pub fn get_recording_state<S: StreamingSource + 'static>(state: &RecorderState<S>) -> SessionState {
    state.session.coordinator().state()
}

/// Get buffer and ingestion counters
pub fn get_buffer_stats<S: StreamingSource + 'static>(state: &RecorderState<S>) -> BufferStats {
    let coordinator = state.session.coordinator();
    let stats = coordinator.stats();
    BufferStats {
        state: coordinator.state(),
        epoch: coordinator.epoch(),
        buffered_frames: coordinator.buffered_len(),
        accepted_frames: stats.accepted,
        dropped_frames: stats.dropped,
    }
}

/// Pause frame delivery without flushing
pub async fn pause_capture<S: StreamingSource + 'static>(
    state: &RecorderState<S>,
) -> Result<(), ErrorResponse> {
    let source = state.session.source();
    let result = source.pause().await;
    source_result(source.as_ref(), result).map_err(ErrorResponse::from)
}

/// Resume frame delivery
pub async fn resume_capture<S: StreamingSource + 'static>(
    state: &RecorderState<S>,
) -> Result<(), ErrorResponse> {
    let source = state.session.source();
    let result = source.resume().await;
    source_result(source.as_ref(), result).map_err(ErrorResponse::from)
}

fn source_result<S: StreamingSource>(source: &S, result: anyhow::Result<()>) -> AppResult<()> {
    result.map_err(|e| AppError::Source(format!("{}: {:#}", source.id(), e)))
}
