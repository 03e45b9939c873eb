//! Error types for AppImage Doctor.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the doctor library.
#[derive(Debug, Error)]
pub enum DoctorError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // Registry errors
    #[error("Registry error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },
}

/// Result type alias for doctor operations.
pub type Result<T> = std::result::Result<T, DoctorError>;

impl From<std::io::Error> for DoctorError {
    fn from(err: std::io::Error) -> Self {
        DoctorError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for DoctorError {
    fn from(err: rusqlite::Error) -> Self {
        DoctorError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl DoctorError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        DoctorError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }
}
