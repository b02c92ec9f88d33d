//! Frame model and ingestion
//!
//! - `FrameRecord` and its validated parts
//! - `IntoFrameRecord` for source-specific conversions
//! - `FrameIngestor`, the producer handle used by streaming sources

pub mod ingestor;
pub mod record;

pub use ingestor::{FrameIngestor, IngestStats};
pub use record::{
    CameraPose, FrameError, FrameRecord, IntoFrameRecord, PointCloud, RawCamera, RawFrame,
    RawPointCloud, IDENTITY_TRANSFORM,
};
