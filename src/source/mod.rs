//! Streaming sources
//!
//! This module provides the collaborator traits around the frame producer
//! plus a synthetic source and a test double.

pub mod mock;
pub mod session;
pub mod synthetic;
pub mod traits;

pub use session::CaptureSession;
pub use synthetic::SyntheticSource;
pub use traits::{NoopReset, SessionResetSignal, SourceReset, StreamingSource};
