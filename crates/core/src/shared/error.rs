use thiserror::Error;

use crate::shared::frame::PixelFormat;

/// The camera buffer cannot be turned into a detector input.
///
/// The frame is released and no detection is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("unsupported pixel format: {0:?}")]
    UnsupportedFormat(PixelFormat),
    #[error("rotation must be 0, 90, 180 or 270 degrees, got {0}")]
    InvalidRotation(i32),
    #[error("buffer holds {actual} bytes, {width}x{height} {format:?} needs {expected}")]
    BufferSizeMismatch {
        format: PixelFormat,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Opaque detector failure. The frame's result is discarded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    #[error("detection failed: {0}")]
    Failed(String),
    #[error("detection was dropped before it completed")]
    Abandoned,
    #[error("detector unavailable: {0}")]
    Unavailable(String),
}

/// A completion arrived that the overlay no longer accepts.
///
/// Never surfaced to the host; callers log it at debug level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StaleCallbackError {
    #[error("overlay has been torn down")]
    TornDown,
    #[error("completion belongs to session {completion}, current session is {current}")]
    SupersededSession { completion: u64, current: u64 },
    #[error("sequence {sequence} is older than last applied sequence {last_applied}")]
    OutOfOrder { sequence: u64, last_applied: u64 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),
}
