//! Flush coordinator
//!
//! Owns the shared frame buffer and runs the flush protocol: swap the
//! buffer out, write the drained batch as one artifact, then signal the
//! session reset.

use super::buffer::{Batch, FrameBuffer};
use super::state::{FlushError, FlushSummary, SessionState};
use crate::artifact::{artifact_stem, write_artifact};
use crate::config::RecorderConfig;
use crate::frame::ingestor::IngestCounters;
use crate::frame::{FrameIngestor, IngestStats};
use crate::source::SessionResetSignal;
use chrono::Local;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Events emitted while recording
#[derive(Debug, Clone)]
pub enum RecordingEvent {
    /// A frame failed validation and was discarded
    FrameDropped(String),
    /// The buffer was swapped out and a flush began
    FlushStarted { epoch: u64, frame_count: usize },
    /// An artifact was written
    Flushed(FlushSummary),
    /// A flush failed; its frames are lost
    FlushFailed(String),
    /// The session-reset signal was delivered
    SessionReset,
    /// Error outside the flush result itself
    Error(String),
}

/// Owns the frame buffer and serializes flushes
pub struct FlushCoordinator {
    buffer: Arc<FrameBuffer>,
    counters: Arc<IngestCounters>,

    /// Current session state
    state: Arc<RwLock<SessionState>>,

    /// Set while a flush is between its swap and its reset signal
    in_flight: Arc<AtomicBool>,

    config: RecorderConfig,
    reset: Arc<dyn SessionResetSignal>,

    /// Event broadcaster
    event_tx: broadcast::Sender<RecordingEvent>,
}

impl FlushCoordinator {
    /// Create a coordinator with an empty buffer
    pub fn new(config: RecorderConfig, reset: Arc<dyn SessionResetSignal>) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            buffer: Arc::new(FrameBuffer::new()),
            counters: Arc::default(),
            state: Arc::new(RwLock::new(SessionState::Streaming)),
            in_flight: Arc::new(AtomicBool::new(false)),
            config,
            reset,
            event_tx,
        }
    }

    /// Producer handle for a streaming source
    pub fn ingestor(&self) -> FrameIngestor {
        FrameIngestor::new(
            self.buffer.clone(),
            self.counters.clone(),
            self.event_tx.clone(),
        )
    }

    /// Get the current session state
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Whether a flush is currently in progress
    pub fn is_flushing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Frames waiting in the live buffer
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Current buffer epoch
    pub fn epoch(&self) -> u64 {
        self.buffer.epoch()
    }

    pub fn stats(&self) -> IngestStats {
        self.counters.snapshot()
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    /// Flush the buffer to a new artifact and return its path
    pub async fn flush(&self) -> Result<PathBuf, FlushError> {
        self.flush_detailed()
            .await
            .map(|summary| PathBuf::from(summary.artifact_path))
    }

    /// Flush the buffer to a new artifact
    ///
    /// Fails with `ConcurrentFlushRejected` without touching the buffer when
    /// another flush has not yet delivered its reset signal. Once the
    /// buffer is swapped, the write runs on its own task and completes even
    /// if this future is dropped.
    pub async fn flush_detailed(&self) -> Result<FlushSummary, FlushError> {
        self.claim()?.flush().await
    }

    /// Reserve the flush slot without touching the buffer
    ///
    /// Lets a caller do its own preparation (pausing a source) only once it
    /// is known to own the next flush. Dropping the ticket unused releases
    /// the slot.
    pub fn claim(&self) -> Result<FlushTicket<'_>, FlushError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Rejecting flush: another flush is in progress");
            return Err(FlushError::ConcurrentFlushRejected);
        }
        Ok(FlushTicket {
            coordinator: self,
            guard: FlushGuard {
                state: self.state.clone(),
                in_flight: self.in_flight.clone(),
            },
        })
    }
}

/// Exclusive right to run the next flush
pub struct FlushTicket<'a> {
    coordinator: &'a FlushCoordinator,
    guard: FlushGuard,
}

impl FlushTicket<'_> {
    /// Swap the buffer out and write it
    pub async fn flush(self) -> Result<FlushSummary, FlushError> {
        let FlushTicket { coordinator, guard } = self;

        let batch = {
            let mut state = coordinator.state.write();
            let batch = coordinator.buffer.swap();
            *state = SessionState::Flushing;
            batch
        };
        let stem = artifact_stem(&Local::now());

        tracing::info!(
            "Flushing epoch {} ({} frames) as {}",
            batch.epoch,
            batch.records.len(),
            stem
        );
        let _ = coordinator.event_tx.send(RecordingEvent::FlushStarted {
            epoch: batch.epoch,
            frame_count: batch.records.len(),
        });

        let config = &coordinator.config;
        let job = FlushJob {
            batch,
            stem,
            output_dir: config.output_dir.clone(),
            pretty: config.pretty_print,
            reset_after_failure: config.reset_after_failed_flush,
            buffer: coordinator.buffer.clone(),
            reset: coordinator.reset.clone(),
            event_tx: coordinator.event_tx.clone(),
            guard,
        };

        match tokio::spawn(job.run()).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Flush task panicked: {}", e);
                Err(FlushError::Interrupted(e.to_string()))
            }
        }
    }
}

/// Returns the session to `Streaming` and releases the flush slot
struct FlushGuard {
    state: Arc<RwLock<SessionState>>,
    in_flight: Arc<AtomicBool>,
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        *self.state.write() = SessionState::Streaming;
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Everything a flush needs after the swap
struct FlushJob {
    batch: Batch,
    stem: String,
    output_dir: PathBuf,
    pretty: bool,
    reset_after_failure: bool,
    buffer: Arc<FrameBuffer>,
    reset: Arc<dyn SessionResetSignal>,
    event_tx: broadcast::Sender<RecordingEvent>,
    guard: FlushGuard,
}

impl FlushJob {
    async fn run(self) -> Result<FlushSummary, FlushError> {
        let FlushJob {
            batch,
            stem,
            output_dir,
            pretty,
            reset_after_failure,
            buffer,
            reset,
            event_tx,
            guard,
        } = self;

        let epoch = batch.epoch;
        let frame_count = batch.records.len();

        let written = tokio::task::spawn_blocking(move || {
            write_artifact(&output_dir, &stem, &batch.records, pretty)
        })
        .await;
        let written = match written {
            Ok(result) => result.map_err(FlushError::from),
            Err(e) => Err(FlushError::Interrupted(e.to_string())),
        };

        let session_reset = match &written {
            Ok(_) => deliver_reset(&buffer, reset.as_ref(), &event_tx).await,
            Err(_) if reset_after_failure => {
                deliver_reset(&buffer, reset.as_ref(), &event_tx).await
            }
            Err(_) => {
                tracing::info!("Skipping session reset after failed flush");
                false
            }
        };

        let result = match written {
            Ok(path) => {
                let summary = FlushSummary {
                    artifact_path: path.to_string_lossy().to_string(),
                    epoch,
                    frame_count,
                    session_reset,
                };
                tracing::info!("Flushed {} frames to {:?}", frame_count, path);
                let _ = event_tx.send(RecordingEvent::Flushed(summary.clone()));
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(
                    "Flush of epoch {} failed, {} frames lost: {}",
                    epoch,
                    frame_count,
                    e
                );
                let _ = event_tx.send(RecordingEvent::FlushFailed(e.to_string()));
                Err(e)
            }
        };

        drop(guard);
        result
    }
}

/// Frame ordering is relaxed while this is alive
struct ResetWindow<'a>(&'a FrameBuffer);

impl<'a> ResetWindow<'a> {
    fn open(buffer: &'a FrameBuffer) -> Self {
        buffer.begin_session_reset();
        Self(buffer)
    }
}

impl Drop for ResetWindow<'_> {
    fn drop(&mut self) {
        self.0.end_session_reset();
    }
}

/// Signal the session reset
///
/// The source restarts its clock during the reset, so frame ordering is
/// relaxed for the duration and restarted afterwards.
async fn deliver_reset(
    buffer: &FrameBuffer,
    reset: &dyn SessionResetSignal,
    event_tx: &broadcast::Sender<RecordingEvent>,
) -> bool {
    let outcome = {
        let _window = ResetWindow::open(buffer);
        reset.reset_session().await
    };

    match outcome {
        Ok(()) => {
            let _ = event_tx.send(RecordingEvent::SessionReset);
            true
        }
        Err(e) => {
            tracing::warn!("Session reset failed: {:#}", e);
            let _ = event_tx.send(RecordingEvent::Error(format!("Session reset failed: {}", e)));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{RawCamera, RawFrame, IDENTITY_TRANSFORM};
    use crate::source::NoopReset;
    use async_trait::async_trait;
    use tempfile::tempdir;
    use tokio::sync::Notify;

    fn frame(timestamp: f64) -> RawFrame {
        RawFrame {
            timestamp,
            camera: Some(RawCamera {
                transform: IDENTITY_TRANSFORM,
                euler_angles: [0.0, 0.0, 0.0],
            }),
            raw_feature_points: None,
        }
    }

    /// Reset signal that blocks until released
    #[derive(Default)]
    struct GatedReset {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl SessionResetSignal for GatedReset {
        async fn reset_session(&self) -> anyhow::Result<()> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_second_flush_is_rejected_while_first_in_flight() {
        let dir = tempdir().unwrap();
        let gate = Arc::new(GatedReset::default());
        let coordinator = Arc::new(FlushCoordinator::new(
            RecorderConfig::with_output_dir(dir.path()),
            gate.clone(),
        ));
        let ingestor = coordinator.ingestor();
        ingestor.add_frame(frame(0.0));

        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.flush().await })
        };
        gate.entered.notified().await;

        assert_eq!(coordinator.state(), SessionState::Flushing);
        assert!(coordinator.is_flushing());

        // Frames keep flowing into the new epoch meanwhile
        ingestor.add_frame(frame(0.1));
        assert!(matches!(
            coordinator.flush().await,
            Err(FlushError::ConcurrentFlushRejected)
        ));
        assert_eq!(coordinator.buffered_len(), 1);

        gate.release.notify_one();
        let path = first.await.unwrap().unwrap();
        assert!(path.exists());
        assert_eq!(coordinator.state(), SessionState::Streaming);
        assert!(!coordinator.is_flushing());
    }

    #[tokio::test]
    async fn test_dropped_flush_future_still_writes() {
        let dir = tempdir().unwrap();
        let gate = Arc::new(GatedReset::default());
        let coordinator = Arc::new(FlushCoordinator::new(
            RecorderConfig::with_output_dir(dir.path()),
            gate.clone(),
        ));
        let mut events = coordinator.subscribe();
        coordinator.ingestor().add_frame(frame(0.0));
        coordinator.ingestor().add_frame(frame(0.5));

        let caller = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.flush().await })
        };
        gate.entered.notified().await;
        assert_eq!(coordinator.buffered_len(), 0);

        // The caller goes away while the flush is past its swap
        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());
        gate.release.notify_one();

        let summary = loop {
            match events.recv().await.unwrap() {
                RecordingEvent::Flushed(summary) => break summary,
                RecordingEvent::FlushFailed(e) => panic!("flush failed: {}", e),
                _ => continue,
            }
        };
        assert_eq!(summary.frame_count, 2);
        assert!(summary.session_reset);
        assert!(Path::new(&summary.artifact_path).exists());
    }

    #[tokio::test]
    async fn test_source_clock_restart_during_reset_is_accepted() {
        let dir = tempdir().unwrap();
        let gate = Arc::new(GatedReset::default());
        let coordinator = Arc::new(FlushCoordinator::new(
            RecorderConfig::with_output_dir(dir.path()),
            gate.clone(),
        ));
        let ingestor = coordinator.ingestor();
        ingestor.add_frame(frame(4.9));

        let flush = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.flush().await })
        };
        gate.entered.notified().await;

        // Late frame from the old session, then the restarted clock
        ingestor.add_frame(frame(5.0));
        ingestor.add_frame(frame(0.0));
        gate.release.notify_one();
        flush.await.unwrap().unwrap();

        for i in 0..5 {
            ingestor.add_frame(frame(0.033 * i as f64));
        }
        assert_eq!(coordinator.buffered_len(), 7);
        assert_eq!(coordinator.stats().dropped, 0);
        assert_eq!(coordinator.stats().accepted, 8);
    }

    #[tokio::test]
    async fn test_unused_claim_releases_the_slot() {
        let dir = tempdir().unwrap();
        let coordinator =
            FlushCoordinator::new(RecorderConfig::with_output_dir(dir.path()), Arc::new(NoopReset));
        coordinator.ingestor().add_frame(frame(0.0));

        let ticket = coordinator.claim().unwrap();
        assert!(coordinator.is_flushing());
        assert!(matches!(coordinator.claim(), Err(FlushError::ConcurrentFlushRejected)));
        drop(ticket);

        assert!(!coordinator.is_flushing());
        assert_eq!(coordinator.buffered_len(), 1);
        let summary = coordinator.claim().unwrap().flush().await.unwrap();
        assert_eq!(summary.frame_count, 1);
    }

    #[tokio::test]
    async fn test_epoch_advances_per_flush() {
        let dir = tempdir().unwrap();
        let coordinator =
            FlushCoordinator::new(RecorderConfig::with_output_dir(dir.path()), Arc::new(NoopReset));

        let first = coordinator.flush_detailed().await.unwrap();
        let second = coordinator.flush_detailed().await.unwrap();

        assert_eq!(first.epoch, 0);
        assert_eq!(second.epoch, 1);
        assert_eq!(coordinator.epoch(), 2);
        assert_ne!(first.artifact_path, second.artifact_path);
    }
}
