//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur while persisting a cache.
///
/// Loading is fail-safe and never produces these: a missing or unreadable
/// cache file loads as empty, which triggers a rebuild of what it described.
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

    /// A cache could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// A map with this name is already open in the manager.
    #[error("cache map `{name}` is already open")]
    AlreadyOpen {
        /// The map name.
        name: String,
    },

    /// The manager was used after it was closed.
    #[error("cache manager is closed")]
    Closed,
}
