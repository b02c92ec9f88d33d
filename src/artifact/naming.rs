//! Artifact file naming
//!
//! Artifacts are named after the local flush time at second resolution.
//! Collisions within the same second get a zero-padded counter suffix,
//! chosen so that names still sort in flush order.

use chrono::{DateTime, TimeZone};

/// File extension for flush artifacts
pub const ARTIFACT_EXTENSION: &str = "json";

/// Upper bound on same-second disambiguation attempts
pub const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Name stem for an artifact flushed at `at`, e.g. `2024-10-03_14-22-30`
pub fn artifact_stem<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// File name for the given stem and collision attempt
///
/// Attempt 0 is the bare stem; later attempts append `_001`, `_002`, ...
/// (`_` sorts after `.`, so suffixed names follow the bare one).
pub fn artifact_file_name(stem: &str, attempt: u32) -> String {
    if attempt == 0 {
        format!("{}.{}", stem, ARTIFACT_EXTENSION)
    } else {
        format!("{}_{:03}.{}", stem, attempt, ARTIFACT_EXTENSION)
    }
}
