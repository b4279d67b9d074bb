//! Error types for loading, training and persistence

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StormError>;

#[derive(Debug, Error)]
pub enum StormError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed row or cell in the input data
    #[error("parse error at line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("training failed: {0}")]
    Training(String),

    /// Corrupt, truncated or foreign model artifact
    #[error("invalid model artifact {}: {message}", path.display())]
    Format { path: PathBuf, message: String },

    #[error("metrics error: {0}")]
    Metrics(String),
}

impl From<prometheus::Error> for StormError {
    fn from(err: prometheus::Error) -> Self {
        StormError::Metrics(err.to_string())
    }
}

impl StormError {
    /// Map an I/O error on `path`, keeping "not found" distinguishable
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            StormError::FileNotFound { path }
        } else {
            StormError::Io { path, source }
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        StormError::Format {
            path: path.into(),
            message: message.into(),
        }
    }
}
