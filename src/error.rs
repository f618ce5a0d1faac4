//! Centralized error types for mboxstat.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mboxstat library.
#[derive(Error, Debug)]
pub enum MboxError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Neither a plain MBOX nor a usable ZIP + in-archive path was given.
    #[error("Invalid input: {0}")]
    InvalidSource(String),

    /// The ZIP container could not be read.
    #[error("Archive error in '{path}': {reason}")]
    Archive { path: PathBuf, reason: String },

    /// An untagged header chunk carried a byte outside 7-bit ASCII.
    ///
    /// Well-formed encoded-word input never produces this; it marks a data
    /// contract violation for the single header value being decoded.
    #[error("Non-ASCII byte in untagged header chunk: {chunk:?} (in {value:?})")]
    NonAsciiHeaderChunk { chunk: String, value: String },

    /// The requested header was never observed in the aggregated data.
    #[error("There is no such header ({0})!")]
    NoSuchHeader(String),

    /// A serialized composite key could not be restored.
    #[error("Invalid composite key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for `Result<T, MboxError>`.
pub type Result<T> = std::result::Result<T, MboxError>;

impl MboxError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `MboxError`
/// when no path context is available (rare, prefer `MboxError::io`).
impl From<std::io::Error> for MboxError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
