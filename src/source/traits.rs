//! Streaming source trait definitions
//!
//! Platform-agnostic traits for the tracking subsystem that produces frames
//! and for whatever reacts to a session reset after a flush.

use async_trait::async_trait;
use std::sync::Arc;

/// Lifecycle controls of a frame-producing tracking session
#[async_trait]
pub trait StreamingSource: Send + Sync {
    /// Human-readable identifier used in logs
    fn id(&self) -> &str;

    /// Stop delivering frames
    async fn pause(&self) -> anyhow::Result<()>;

    /// Continue delivering frames
    async fn resume(&self) -> anyhow::Result<()>;

    /// Discard all tracking state accumulated so far
    async fn reset(&self) -> anyhow::Result<()>;
}

/// Receiver of the session-reset signal issued after a flush
///
/// Implementations clear state derived from the old session and restart
/// the streaming source with tracking reset.
#[async_trait]
pub trait SessionResetSignal: Send + Sync {
    async fn reset_session(&self) -> anyhow::Result<()>;
}

/// Reset signal that does nothing, for hosts without a controllable source
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReset;

#[async_trait]
impl SessionResetSignal for NoopReset {
    async fn reset_session(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Reset signal that resets a streaming source and starts it again
pub struct SourceReset<S: StreamingSource> {
    source: Arc<S>,
}

impl<S: StreamingSource> SourceReset<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: StreamingSource> SessionResetSignal for SourceReset<S> {
    async fn reset_session(&self) -> anyhow::Result<()> {
        tracing::info!("Resetting tracking session on {}", self.source.id());
        self.source.reset().await?;
        self.source.resume().await?;
        Ok(())
    }
}
