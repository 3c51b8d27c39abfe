//! Error types for transactions and their stash.

use std::path::{Path, PathBuf};

use ictx_common::BoxError;

/// Errors raised while stashing, restoring, or discarding output files.
#[derive(Debug, thiserror::Error)]
pub enum StashError {
    /// An I/O error occurred on an output file or inside the stash.
    #[error("stash I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A registered path exists but is not a regular file.
    #[error("cannot stash {path}: not a regular file")]
    NotAFile {
        /// The offending path.
        path: PathBuf,
    },

    /// A stashed copy no longer matches the bytes captured at registration.
    #[error("stashed copy of {path} is corrupt: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The original output file the backup belongs to.
        path: PathBuf,
        /// Checksum recorded when the file was stashed.
        expected: String,
        /// Checksum of the stashed copy at restore time.
        actual: String,
    },
}

impl StashError {
    /// Returns a closure that wraps an I/O error with `path`.
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> StashError + '_ {
        move |source| StashError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Closing the caches manager failed.
///
/// Kept distinct from body failures so a build driver can tell "compilation
/// failed" apart from "cache bookkeeping did not persist", and fall back to a
/// full rebuild in the latter case.
#[derive(Debug, thiserror::Error)]
#[error("failed to close incremental caches: {source}")]
pub struct CachesManagerCloseError {
    /// The error returned by the caches manager.
    pub source: BoxError,
}

/// A failure of the cleanup phase of a transaction.
#[derive(Debug, thiserror::Error)]
pub enum CloseError {
    /// The caches manager failed to close.
    #[error(transparent)]
    Caches(#[from] CachesManagerCloseError),
    /// Output files could not be restored, or the stash could not be removed.
    #[error(transparent)]
    Stash(#[from] StashError),
}

/// The failure outcome of [`run_within`](crate::CompilationTransaction::run_within).
///
/// Precedence when several things fail: a caches close failure wins over a
/// stash failure, which wins over the body's own error. The body's error is
/// never dropped; it travels in the `body` field of the winning variant.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError<E> {
    /// The compilation body returned an error; cleanup succeeded.
    #[error(transparent)]
    Body(E),

    /// The caches manager failed to close.
    #[error("{close}")]
    CachesClose {
        /// The close failure.
        #[source]
        close: CachesManagerCloseError,
        /// The body's error, if it also failed.
        body: Option<E>,
    },

    /// Rolling back or discarding the stash failed.
    #[error("{stash}")]
    Stash {
        /// The stash failure.
        #[source]
        stash: StashError,
        /// The body's error, if it also failed.
        body: Option<E>,
    },
}

impl<E> TransactionError<E> {
    /// Attaches the body's result to a cleanup failure.
    pub(crate) fn from_close(close: CloseError, body: Option<E>) -> Self {
        match close {
            CloseError::Caches(close) => TransactionError::CachesClose { close, body },
            CloseError::Stash(stash) => TransactionError::Stash { stash, body },
        }
    }

    /// Returns the body's error, whichever variant carries it.
    pub fn body_error(&self) -> Option<&E> {
        match self {
            TransactionError::Body(e) => Some(e),
            TransactionError::CachesClose { body, .. } | TransactionError::Stash { body, .. } => {
                body.as_ref()
            }
        }
    }

    /// Consumes the error and returns the body's error, if any.
    pub fn into_body_error(self) -> Option<E> {
        match self {
            TransactionError::Body(e) => Some(e),
            TransactionError::CachesClose { body, .. } | TransactionError::Stash { body, .. } => {
                body
            }
        }
    }

    /// Returns `true` if closing the caches manager failed.
    pub fn is_caches_close(&self) -> bool {
        matches!(self, TransactionError::CachesClose { .. })
    }
}
