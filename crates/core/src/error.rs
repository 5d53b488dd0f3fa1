//! Error types for the recorder.

use std::path::PathBuf;

use thiserror::Error;

/// Why a recording command was not dispatched.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// Presented token does not match the configured one
    #[error("recording request rejected: token mismatch")]
    Unauthorized,

    /// Send failed, or no reply arrived in time
    #[error("transport failure: {0}")]
    Transport(#[from] jr_runtime::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}
