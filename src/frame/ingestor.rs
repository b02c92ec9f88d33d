//! Frame ingestion
//!
//! The ingestor is the producer-side handle handed to a streaming source.
//! It can only append; draining the buffer is reserved for the flush path.

use super::record::IntoFrameRecord;
use crate::recorder::buffer::FrameBuffer;
use crate::recorder::RecordingEvent;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Counters for frames seen by the ingestor
#[derive(Debug, Default)]
pub(crate) struct IngestCounters {
    accepted: AtomicU64,
    dropped: AtomicU64,
}

impl IngestCounters {
    pub(crate) fn snapshot(&self) -> IngestStats {
        IngestStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of ingestion counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Frames appended to the buffer
    pub accepted: u64,
    /// Frames rejected by validation
    pub dropped: u64,
}

/// Producer handle appending frames to the shared buffer
#[derive(Clone)]
pub struct FrameIngestor {
    buffer: Arc<FrameBuffer>,
    counters: Arc<IngestCounters>,
    event_tx: broadcast::Sender<RecordingEvent>,
}

impl FrameIngestor {
    pub(crate) fn new(
        buffer: Arc<FrameBuffer>,
        counters: Arc<IngestCounters>,
        event_tx: broadcast::Sender<RecordingEvent>,
    ) -> Self {
        Self {
            buffer,
            counters,
            event_tx,
        }
    }

    /// Normalize a frame and append it
    ///
    /// Invalid frames are dropped; the caller never sees an error.
    pub fn add_frame<F: IntoFrameRecord>(&self, frame: F) {
        let result = frame
            .into_frame_record()
            .and_then(|record| self.buffer.push(record));

        match result {
            Ok(buffered) => {
                self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Buffered frame ({} in epoch)", buffered);
            }
            Err(e) => {
                let dropped = self.counters.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!("Dropping frame: {} ({} dropped so far)", e, dropped);
                let _ = self.event_tx.send(RecordingEvent::FrameDropped(e.to_string()));
            }
        }
    }

    /// Current ingestion counters
    pub fn stats(&self) -> IngestStats {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{RawCamera, RawFrame, IDENTITY_TRANSFORM};

    fn setup() -> (FrameIngestor, Arc<FrameBuffer>, broadcast::Receiver<RecordingEvent>) {
        let buffer = Arc::new(FrameBuffer::new());
        let (tx, rx) = broadcast::channel(16);
        let ingestor = FrameIngestor::new(buffer.clone(), Arc::default(), tx);
        (ingestor, buffer, rx)
    }

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

    #[test]
    fn test_valid_frames_are_buffered() {
        let (ingestor, buffer, _rx) = setup();
        ingestor.add_frame(frame(0.0));
        ingestor.add_frame(frame(0.033));

        assert_eq!(buffer.len(), 2);
        assert_eq!(ingestor.stats(), IngestStats { accepted: 2, dropped: 0 });
    }

    #[test]
    fn test_malformed_frames_are_dropped_silently() {
        let (ingestor, buffer, mut rx) = setup();
        let mut no_pose = frame(0.0);
        no_pose.camera = None;

        ingestor.add_frame(no_pose);
        ingestor.add_frame(frame(1.0));
        ingestor.add_frame(frame(0.5));

        assert_eq!(buffer.len(), 1);
        assert_eq!(ingestor.stats(), IngestStats { accepted: 1, dropped: 2 });
        assert!(matches!(rx.try_recv(), Ok(RecordingEvent::FrameDropped(_))));
    }
}
