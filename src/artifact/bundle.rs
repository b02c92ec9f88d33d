//! Artifact read/write operations
//!
//! An artifact is a single JSON document holding the frames of one buffer
//! epoch, in arrival order. It is written to a temporary file next to its
//! destination, synced, and then moved into place without replacing any
//! existing file, so it is never visible half written.

use super::naming::{artifact_file_name, MAX_NAME_ATTEMPTS};
use crate::frame::FrameRecord;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Artifact-related errors
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No free artifact name for {0}")]
    NameExhausted(String),
}

/// Encode records as an artifact document
pub fn encode_records(records: &[FrameRecord], pretty: bool) -> Result<Vec<u8>, ArtifactError> {
    let bytes = if pretty {
        serde_json::to_vec_pretty(records)?
    } else {
        serde_json::to_vec(records)?
    };
    Ok(bytes)
}

/// Write records to a new artifact in `dir`
///
/// Returns the final path. `dir` is created if it does not exist.
pub fn write_artifact(
    dir: &Path,
    stem: &str,
    records: &[FrameRecord],
    pretty: bool,
) -> Result<PathBuf, ArtifactError> {
    let bytes = encode_records(records, pretty)?;

    fs::create_dir_all(dir)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".flush-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(&bytes)?;
    temp.as_file().sync_all()?;

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(artifact_file_name(stem, attempt));
        match temp.persist_noclobber(&path) {
            Ok(_) => {
                sync_dir(dir);
                tracing::debug!(
                    "Wrote {} frames ({} bytes) to {:?}",
                    records.len(),
                    bytes.len(),
                    path
                );
                return Ok(path);
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!("Artifact {:?} already exists, trying next name", path);
                temp = e.file;
            }
            Err(e) => return Err(e.error.into()),
        }
    }

    Err(ArtifactError::NameExhausted(stem.to_string()))
}

/// Read all records from an artifact
pub fn read_artifact(path: &Path) -> Result<Vec<FrameRecord>, ArtifactError> {
    let content = fs::read(path)?;
    let records: Vec<FrameRecord> = serde_json::from_slice(&content)?;

    tracing::debug!("Loaded {} frames from {:?}", records.len(), path);

    Ok(records)
}

/// Persist the rename itself; failures only weaken durability
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    {
        if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
            tracing::warn!("Failed to sync directory {:?}: {}", dir, e);
        }
    }

    #[cfg(not(unix))]
    {
        let _ = dir;
    }
}
