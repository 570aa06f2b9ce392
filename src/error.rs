//! Error types for media-dl
//!
//! The engine converts every executor-side failure into a status transition
//! plus a message, so most of these variants only surface at construction
//! time or from utility helpers. Cancellation is a distinct variant so it is
//! never mistaken for a transient transfer failure.

use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "output_dir")
        key: Option<String>,
    },

    /// Malformed or unsupported download URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The executor reported a transfer or transcode failure
    #[error("execution failed: {0}")]
    Execute(String),

    /// The job observed its cancellation token and aborted cooperatively
    #[error("cancelled")]
    Cancelled,

    /// Insufficient disk space
    #[error("insufficient disk space: need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        /// Number of bytes required for the operation
        required: u64,
        /// Number of bytes currently available on disk
        available: u64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation not supported (missing binary, stub implementation, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error represents cooperative cancellation rather than a
    /// genuine failure. The worker uses this to keep cancelled jobs out of
    /// the retry path.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
