//! Shared frame buffer
//!
//! Double-buffered storage for incoming frames. Producers append under a
//! short lock; the flush path swaps the whole vector out under the same
//! lock so a batch is never observed half drained.

use crate::frame::{FrameError, FrameRecord};
use parking_lot::Mutex;

/// Frames drained from the buffer by one swap
#[derive(Debug)]
pub struct Batch {
    /// Epoch the frames were captured in
    pub epoch: u64,
    pub records: Vec<FrameRecord>,
}

#[derive(Debug, Default)]
struct Epoch {
    index: u64,
    records: Vec<FrameRecord>,
    last_timestamp: Option<f64>,
    /// Set while the session-reset signal is being delivered
    resetting: bool,
}

/// Append-only frame buffer with an atomic swap
#[derive(Debug, Default)]
pub struct FrameBuffer {
    inner: Mutex<Epoch>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the current epoch
    ///
    /// Rejects records older than the last one accepted in this epoch,
    /// except while a session reset is in progress: the source restarts its
    /// clock there.
    pub fn push(&self, record: FrameRecord) -> Result<usize, FrameError> {
        let mut epoch = self.inner.lock();
        if let Some(previous) = epoch.last_timestamp {
            if record.timestamp < previous && !epoch.resetting {
                return Err(FrameError::TimestampRegression {
                    previous,
                    got: record.timestamp,
                });
            }
        }
        epoch.last_timestamp = Some(record.timestamp);
        epoch.records.push(record);
        Ok(epoch.records.len())
    }

    /// Take every buffered record and start a new, empty epoch
    pub(crate) fn swap(&self) -> Batch {
        let mut epoch = self.inner.lock();
        let next = Epoch {
            index: epoch.index + 1,
            ..Epoch::default()
        };
        let previous = std::mem::replace(&mut *epoch, next);
        Batch {
            epoch: previous.index,
            records: previous.records,
        }
    }

    /// Mark the start of a session reset
    ///
    /// Timestamp ordering is not enforced until `end_session_reset`.
    pub(crate) fn begin_session_reset(&self) {
        let mut epoch = self.inner.lock();
        epoch.resetting = true;
        epoch.last_timestamp = None;
    }

    /// Mark the end of a session reset; the next frame starts a new timeline
    pub(crate) fn end_session_reset(&self) {
        let mut epoch = self.inner.lock();
        epoch.resetting = false;
        epoch.last_timestamp = None;
    }

    /// Number of records in the current epoch
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the current epoch (starts at 0, bumped by every swap)
    pub fn epoch(&self) -> u64 {
        self.inner.lock().index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{CameraPose, IDENTITY_TRANSFORM};

    fn record(timestamp: f64) -> FrameRecord {
        let pose = CameraPose::new(IDENTITY_TRANSFORM, [0.0; 3]).unwrap();
        FrameRecord::new(timestamp, pose, None).unwrap()
    }

    #[test]
    fn test_swap_drains_everything_and_bumps_epoch() {
        let buffer = FrameBuffer::new();
        buffer.push(record(0.0)).unwrap();
        buffer.push(record(0.1)).unwrap();

        let batch = buffer.swap();
        assert_eq!(batch.epoch, 0);
        assert_eq!(batch.records.len(), 2);
        assert!(buffer.is_empty());
        assert_eq!(buffer.epoch(), 1);

        let empty = buffer.swap();
        assert_eq!(empty.epoch, 1);
        assert!(empty.records.is_empty());
    }

    #[test]
    fn test_timestamp_regression_is_per_epoch() {
        let buffer = FrameBuffer::new();
        buffer.push(record(5.0)).unwrap();
        buffer.push(record(5.0)).unwrap();
        assert!(matches!(
            buffer.push(record(4.0)),
            Err(FrameError::TimestampRegression { .. })
        ));
        assert_eq!(buffer.len(), 2);

        // A fresh epoch accepts any starting timestamp
        buffer.swap();
        assert_eq!(buffer.push(record(0.0)).unwrap(), 1);
    }

    #[test]
    fn test_session_reset_restarts_timeline() {
        let buffer = FrameBuffer::new();
        buffer.swap();

        // Late frame from the old session lands in the new epoch
        buffer.push(record(10.0)).unwrap();

        buffer.begin_session_reset();
        buffer.push(record(12.0)).unwrap();
        buffer.push(record(0.0)).unwrap();
        buffer.end_session_reset();

        buffer.push(record(0.01)).unwrap();
        buffer.push(record(0.02)).unwrap();
        assert_eq!(buffer.len(), 5);

        assert!(matches!(
            buffer.push(record(0.015)),
            Err(FrameError::TimestampRegression { .. })
        ));
    }
}
