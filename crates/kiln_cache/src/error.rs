//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Most cache reads are fail-safe: errors result in cache misses rather
/// than hard failures. This enum is used for internal error propagation
/// and for the few operations whose caller needs to know what went wrong,
/// such as initialising the cache directory.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An artifact file has an invalid or truncated header.
    #[error("invalid artifact header in {path}: {reason}")]
    InvalidHeader {
        /// The artifact file path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// A compressed payload could not be decompressed.
    #[error("corrupt payload in {path}: {reason}")]
    CorruptPayload {
        /// The artifact file path.
        path: PathBuf,
        /// Description of the decompression failure.
        reason: String,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}
