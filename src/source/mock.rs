//! Mock streaming source
//!
//! Records every lifecycle call so tests can assert on the order in which
//! the recorder drives the source.

use super::traits::StreamingSource;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Lifecycle call observed by `MockSource`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCall {
    Pause,
    Resume,
    Reset,
}

/// Streaming source double
#[derive(Debug, Default)]
pub struct MockSource {
    calls: Mutex<Vec<SourceCall>>,
    paused: AtomicBool,
    fail_reset: AtomicBool,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `reset` calls fail
    pub fn fail_resets(&self, fail: bool) {
        self.fail_reset.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().clone()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamingSource for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    async fn pause(&self) -> anyhow::Result<()> {
        self.calls.lock().push(SourceCall::Pause);
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&self) -> anyhow::Result<()> {
        self.calls.lock().push(SourceCall::Resume);
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn reset(&self) -> anyhow::Result<()> {
        self.calls.lock().push(SourceCall::Reset);
        if self.fail_reset.load(Ordering::SeqCst) {
            anyhow::bail!("mock reset failure");
        }
        Ok(())
    }
}
