//! Recording system module
//!
//! This module implements the frame buffering and flush pipeline:
//! - FrameBuffer, the double-buffered store shared with the ingestor
//! - FlushCoordinator to drain the buffer into artifacts
//! - Session state and flush errors

pub mod buffer;
pub mod coordinator;
pub mod state;

pub use buffer::FrameBuffer;
pub use coordinator::{FlushCoordinator, FlushTicket, RecordingEvent};
pub use state::{FlushError, FlushSummary, SessionState};
