//! Error types and handling
//!
//! Common error types used across the application.

use crate::config::ConfigError;
use crate::recorder::FlushError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Flush(#[from] FlushError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source error: {0}")]
    Source(String),
}

/// Error response for the host UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Flush(FlushError::IoFailure(_)) => "IO_ERROR",
            AppError::Flush(FlushError::SerializationFailure(_)) => "SERIALIZATION_ERROR",
            AppError::Flush(FlushError::ConcurrentFlushRejected) => "FLUSH_IN_PROGRESS",
            AppError::Flush(FlushError::Interrupted(_)) => "FLUSH_INTERRUPTED",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Source(_) => "SOURCE_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

impl From<FlushError> for ErrorResponse {
    fn from(error: FlushError) -> Self {
        AppError::from(error).into()
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_errors_have_stable_codes() {
        let busy: ErrorResponse = FlushError::ConcurrentFlushRejected.into();
        assert_eq!(busy.code, "FLUSH_IN_PROGRESS");
        assert_eq!(busy.message, "A flush is already in progress");

        let disk_full = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let io: ErrorResponse = FlushError::IoFailure(disk_full).into();
        assert_eq!(io.code, "IO_ERROR");
        assert!(io.message.contains("disk full"));
    }
}
