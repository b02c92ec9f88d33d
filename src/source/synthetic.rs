//! Synthetic streaming source
//!
//! Produces an orbiting camera looking at a ring of tracked feature
//! points. Used by the headless runner in place of a real tracker.

use super::traits::StreamingSource;
use crate::frame::{FrameIngestor, RawCamera, RawFrame, RawPointCloud};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Feature points on the ring around the origin
const RING_POINTS: u64 = 8;

/// Every Nth frame carries no point cloud
const SPARSE_EVERY: u64 = 3;

/// Orbit angular speed in radians per second
const ORBIT_SPEED: f32 = 0.5;

/// Deterministic frame generator with pause/resume/reset
pub struct SyntheticSource {
    paused: AtomicBool,
    /// Tracking origin; reset moves it to "now"
    origin: Mutex<Instant>,
    frame_index: Mutex<u64>,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self {
            paused: AtomicBool::new(false),
            origin: Mutex::new(Instant::now()),
            frame_index: Mutex::new(0),
        }
    }
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Build the next frame, or `None` while paused
    pub fn next_frame(&self) -> Option<RawFrame> {
        if self.is_paused() {
            return None;
        }

        let timestamp = self.origin.lock().elapsed().as_secs_f64();
        let index = {
            let mut index = self.frame_index.lock();
            *index += 1;
            *index
        };

        Some(synthesize(timestamp, index))
    }

    /// Deliver frames to `ingestor` at `rate_hz` until the task is aborted
    pub fn spawn(self: Arc<Self>, ingestor: FrameIngestor, rate_hz: u32) -> JoinHandle<()> {
        let period = Duration::from_secs_f64(1.0 / f64::from(rate_hz.max(1)));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if let Some(frame) = self.next_frame() {
                    ingestor.add_frame(frame);
                }
            }
        })
    }
}

/// Camera orbiting the origin at radius 1, yawing to keep it in view
fn synthesize(timestamp: f64, index: u64) -> RawFrame {
    let yaw = ORBIT_SPEED * timestamp as f32;
    let (sin, cos) = yaw.sin_cos();

    let transform = [
        [cos, 0.0, -sin, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [sin, 0.0, cos, 0.0],
        [sin, 0.0, cos, 1.0],
    ];

    let raw_feature_points = (index % SPARSE_EVERY != 0).then(|| {
        let points = (0..RING_POINTS)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / RING_POINTS as f32;
                [0.25 * angle.cos(), 0.0, 0.25 * angle.sin()]
            })
            .collect();
        RawPointCloud {
            points,
            identifiers: Some((0..RING_POINTS).collect()),
        }
    });

    RawFrame {
        timestamp,
        camera: Some(RawCamera {
            transform,
            euler_angles: [0.0, yaw, 0.0],
        }),
        raw_feature_points,
    }
}

#[async_trait]
impl StreamingSource for SyntheticSource {
    fn id(&self) -> &str {
        "synthetic"
    }

    async fn pause(&self) -> anyhow::Result<()> {
        self.paused.store(true, Ordering::Release);
        Ok(())
    }

    async fn resume(&self) -> anyhow::Result<()> {
        self.paused.store(false, Ordering::Release);
        Ok(())
    }

    async fn reset(&self) -> anyhow::Result<()> {
        *self.origin.lock() = Instant::now();
        *self.frame_index.lock() = 0;
        Ok(())
    }
}
