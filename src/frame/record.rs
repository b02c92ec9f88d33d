//! Frame record types
//!
//! A `FrameRecord` is the normalized, immutable form of one sample coming
//! from the streaming source. These types double as the artifact schema:
//! their serde representation is exactly what ends up on disk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance used when checking the homogeneous row of a pose transform
const RIGID_TOLERANCE: f32 = 1e-3;

/// Reasons a frame is rejected before it reaches the buffer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("frame has no camera pose")]
    MissingPose,

    #[error("timestamp is not finite: {0}")]
    NonFiniteTimestamp(f64),

    #[error("camera pose contains non-finite values")]
    NonFinitePose,

    #[error("transform is not rigid (bottom row must be [0, 0, 0, 1])")]
    NotRigid,

    #[error("feature point {index} contains non-finite coordinates")]
    NonFinitePoint { index: usize },

    #[error("identifier count {identifiers} does not match point count {points}")]
    IdentifierMismatch { points: usize, identifiers: usize },

    #[error("timestamp {got} is older than previous frame {previous}")]
    TimestampRegression { previous: f64, got: f64 },
}

/// Camera pose: a rigid transform and its orientation angles
///
/// The transform is stored column-major, one inner array per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPose {
    pub transform: [[f32; 4]; 4],
    pub euler_angles: [f32; 3],
}

impl CameraPose {
    /// Build a validated pose
    pub fn new(transform: [[f32; 4]; 4], euler_angles: [f32; 3]) -> Result<Self, FrameError> {
        let all_finite = transform.iter().flatten().all(|v| v.is_finite())
            && euler_angles.iter().all(|v| v.is_finite());
        if !all_finite {
            return Err(FrameError::NonFinitePose);
        }

        // Row 3 of a column-major rigid transform is [0, 0, 0, 1]
        let homogeneous = [0.0, 0.0, 0.0, 1.0];
        let rigid = transform
            .iter()
            .zip(homogeneous)
            .all(|(column, expected)| (column[3] - expected).abs() <= RIGID_TOLERANCE);
        if !rigid {
            return Err(FrameError::NotRigid);
        }

        Ok(Self {
            transform,
            euler_angles,
        })
    }

    /// Camera position in world space (translation column)
    pub fn position(&self) -> [f32; 3] {
        let t = self.transform[3];
        [t[0], t[1], t[2]]
    }
}

/// Sparse feature points observed in a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub points: Vec<[f32; 3]>,

    /// Parallel to `points` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<Vec<u64>>,
}

impl PointCloud {
    /// Build a validated point cloud
    ///
    /// Returns `Ok(None)` for a cloud without any points.
    pub fn new(
        points: Vec<[f32; 3]>,
        identifiers: Option<Vec<u64>>,
    ) -> Result<Option<Self>, FrameError> {
        if let Some(ids) = &identifiers {
            if ids.len() != points.len() {
                return Err(FrameError::IdentifierMismatch {
                    points: points.len(),
                    identifiers: ids.len(),
                });
            }
        }

        if let Some(index) = points
            .iter()
            .position(|p| !p.iter().all(|v| v.is_finite()))
        {
            return Err(FrameError::NonFinitePoint { index });
        }

        if points.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self { points, identifiers }))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One captured sample, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRecord {
    /// Capture time in seconds
    pub timestamp: f64,

    pub camera: CameraPose,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_feature_points: Option<PointCloud>,
}

impl FrameRecord {
    pub fn new(
        timestamp: f64,
        camera: CameraPose,
        raw_feature_points: Option<PointCloud>,
    ) -> Result<Self, FrameError> {
        if !timestamp.is_finite() {
            return Err(FrameError::NonFiniteTimestamp(timestamp));
        }

        Ok(Self {
            timestamp,
            camera,
            raw_feature_points,
        })
    }

    /// Number of feature points carried by this frame
    pub fn point_count(&self) -> usize {
        self.raw_feature_points.as_ref().map_or(0, PointCloud::len)
    }
}

/// Conversion from a source-specific frame into a `FrameRecord`
///
/// Source adapters implement this for their own frame types so the
/// recorder never depends on how a platform serializes its values.
pub trait IntoFrameRecord {
    fn into_frame_record(self) -> Result<FrameRecord, FrameError>;
}

impl IntoFrameRecord for FrameRecord {
    fn into_frame_record(self) -> Result<FrameRecord, FrameError> {
        Ok(self)
    }
}

/// Raw camera data as delivered by a tracking subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCamera {
    pub transform: [[f32; 4]; 4],
    pub euler_angles: [f32; 3],
}

/// Raw feature points as delivered by a tracking subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPointCloud {
    pub points: Vec<[f32; 3]>,
    #[serde(default)]
    pub identifiers: Option<Vec<u64>>,
}

/// Plain-value frame as produced by a streaming source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFrame {
    pub timestamp: f64,
    #[serde(default)]
    pub camera: Option<RawCamera>,
    #[serde(default)]
    pub raw_feature_points: Option<RawPointCloud>,
}

impl IntoFrameRecord for RawFrame {
    fn into_frame_record(self) -> Result<FrameRecord, FrameError> {
        let camera = self.camera.ok_or(FrameError::MissingPose)?;
        let pose = CameraPose::new(camera.transform, camera.euler_angles)?;

        let points = match self.raw_feature_points {
            Some(cloud) => PointCloud::new(cloud.points, cloud.identifiers)?,
            None => None,
        };

        FrameRecord::new(self.timestamp, pose, points)
    }
}

/// Identity transform, column-major
pub const IDENTITY_TRANSFORM: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];
