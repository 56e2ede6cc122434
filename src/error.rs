//! Error types for dockwire-client.

use thiserror::Error;

/// Main error type for all client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while reading a response body or socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The daemon answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or explanation.
        message: String,
    },

    /// Version string is not a dotted numeric version.
    #[error("Invalid API version: {0:?}")]
    InvalidVersion(String),

    /// The negotiated API version is too old for the requested feature.
    #[error("{feature} is not supported in API < {minimum} (negotiated {actual})")]
    UnsupportedVersion {
        /// Feature name.
        feature: &'static str,
        /// Minimum version that supports it.
        minimum: String,
        /// Negotiated version.
        actual: String,
    },

    /// A frame ended before its declared length (strict policy only).
    #[error("Truncated frame: expected {expected} payload bytes, got {actual}")]
    Truncated {
        /// Declared payload length.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// A caller-supplied argument could not be used.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport gateway failure (connection refused, DNS, protocol).
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
