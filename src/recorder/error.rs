//! Errors surfaced synchronously by the recording manager.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("invalid recording key: {reason}")]
    InvalidKey { reason: String },

    #[error("already recording {channel} on {platform}")]
    AlreadyRecording { platform: String, channel: String },

    #[error("unsupported platform '{platform}' (supported: {supported})")]
    UnsupportedPlatform { platform: String, supported: String },

    #[error("failed to create recording directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("no active recording for {channel} on {platform}")]
    NotFound { platform: String, channel: String },

    /// Both termination attempts failed. The registry entry has already been
    /// evicted when this is returned.
    #[error("failed to stop recording (graceful: {graceful}; forceful: {forceful})")]
    Signal {
        graceful: io::Error,
        forceful: io::Error,
    },
}

pub type RecorderResult<T> = Result<T, RecorderError>;
