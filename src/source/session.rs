//! Capture session
//!
//! Host-side flush flow: pause the streaming source, flush, and let the
//! reset signal restart the source with fresh tracking.

use super::traits::{SourceReset, StreamingSource};
use crate::config::RecorderConfig;
use crate::frame::FrameIngestor;
use crate::recorder::{FlushCoordinator, FlushError, FlushSummary};
use std::sync::Arc;

/// A streaming source wired to a flush coordinator
pub struct CaptureSession<S: StreamingSource + 'static> {
    source: Arc<S>,
    coordinator: Arc<FlushCoordinator>,
}

impl<S: StreamingSource + 'static> CaptureSession<S> {
    /// Create a session whose flushes reset and resume `source`
    pub fn new(source: Arc<S>, config: RecorderConfig) -> Self {
        let reset = Arc::new(SourceReset::new(source.clone()));
        let coordinator = Arc::new(FlushCoordinator::new(config, reset));
        Self {
            source,
            coordinator,
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn coordinator(&self) -> &Arc<FlushCoordinator> {
        &self.coordinator
    }

    pub fn ingestor(&self) -> FrameIngestor {
        self.coordinator.ingestor()
    }

    /// Pause the source and flush everything captured so far
    ///
    /// The source is resumed by the reset signal. If the write fails and
    /// the config disables resetting after failures, the source stays
    /// paused and the caller decides what to do.
    pub async fn flush(&self) -> Result<FlushSummary, FlushError> {
        // Only the owner of the flush slot may pause; a rejected caller
        // would otherwise leave the source paused with no reset to follow.
        let ticket = self.coordinator.claim()?;

        if let Err(e) = self.source.pause().await {
            tracing::warn!("Failed to pause {} before flush: {:#}", self.source.id(), e);
        }

        ticket.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{RawCamera, RawFrame, IDENTITY_TRANSFORM};
    use crate::source::mock::{MockSource, SourceCall};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_flush_pauses_resets_and_resumes() {
        let dir = tempdir().unwrap();
        let source = Arc::new(MockSource::new());
        let config = RecorderConfig::with_output_dir(dir.path());
        let session = CaptureSession::new(source.clone(), config);

        session.ingestor().add_frame(RawFrame {
            timestamp: 0.0,
            camera: Some(RawCamera {
                transform: IDENTITY_TRANSFORM,
                euler_angles: [0.0; 3],
            }),
            raw_feature_points: None,
        });

        let summary = session.flush().await.unwrap();
        assert_eq!(summary.frame_count, 1);
        assert!(summary.session_reset);
        assert_eq!(
            source.calls(),
            vec![SourceCall::Pause, SourceCall::Reset, SourceCall::Resume]
        );
        assert!(!source.is_paused());
    }

    #[tokio::test]
    async fn test_failed_reset_is_reported_but_artifact_kept() {
        let dir = tempdir().unwrap();
        let source = Arc::new(MockSource::new());
        source.fail_resets(true);
        let config = RecorderConfig::with_output_dir(dir.path());
        let session = CaptureSession::new(source.clone(), config);

        let summary = session.flush().await.unwrap();
        assert!(!summary.session_reset);
        assert!(std::path::Path::new(&summary.artifact_path).exists());
        assert!(source.is_paused());
    }

    #[tokio::test]
    async fn test_failed_write_without_reset_policy_leaves_source_paused() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let mut config = RecorderConfig::with_output_dir(&blocker);
        config.reset_after_failed_flush = false;
        let source = Arc::new(MockSource::new());
        let session = CaptureSession::new(source.clone(), config);

        assert!(matches!(session.flush().await, Err(FlushError::IoFailure(_))));
        assert_eq!(source.calls(), vec![SourceCall::Pause]);
    }

    #[tokio::test]
    async fn test_rejected_flush_does_not_pause_source() {
        let dir = tempdir().unwrap();
        let source = Arc::new(MockSource::new());
        let config = RecorderConfig::with_output_dir(dir.path());
        let session = CaptureSession::new(source.clone(), config);

        let (first, second) = tokio::join!(session.flush(), session.flush());

        let rejected = [&first, &second]
            .iter()
            .filter(|result| matches!(result, Err(FlushError::ConcurrentFlushRejected)))
            .count();
        assert_eq!(rejected, 1);
        assert!(first.is_ok() || second.is_ok());
        assert!(!source.is_paused());
        assert_eq!(
            source.calls(),
            vec![SourceCall::Pause, SourceCall::Reset, SourceCall::Resume]
        );
    }
}
