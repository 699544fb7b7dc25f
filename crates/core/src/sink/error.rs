//! Error types for event sinks.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while setting up or writing an event sink.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The configured output directory is missing or not a directory.
    #[error("Could not find log directory: {0:?}")]
    MissingDirectory(PathBuf),

    /// A log file could not be opened.
    #[error("Error opening log file {path:?}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing to the open log file failed.
    #[error("Error writing log file {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The event could not be serialized.
    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Type alias for Result with SinkError.
pub type SinkResult<T> = Result<T, SinkError>;
