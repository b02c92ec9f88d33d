//! Flush artifacts
//!
//! Naming and atomic read/write of the JSON files produced by each flush.

pub mod bundle;
pub mod naming;

pub use bundle::{encode_records, read_artifact, write_artifact, ArtifactError};
pub use naming::{artifact_file_name, artifact_stem, ARTIFACT_EXTENSION};
