//! A transaction that never restores output files.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use ictx_common::{CachesManager, InMemoryStorageWrapper};
use ictx_report::{BuildReporter, NoopReporter, ReporterExt};

use crate::error::{CloseError, StashError};
use crate::transaction::{CompilationTransaction, TransactionCore};

/// A transaction without file rollback.
///
/// Output writes and deletions take effect immediately and stay in place when
/// the compilation fails; only the in-memory cache wrappers are reset. Used
/// when the build driver treats the whole output directory as invalid after a
/// failure and rebuilds it by other means.
pub struct NonRecoverableCompilationTransaction {
    core: TransactionCore,
    closed: bool,
}

impl NonRecoverableCompilationTransaction {
    /// Creates a transaction that reports nothing.
    pub fn new() -> Self {
        Self::with_reporter(Arc::new(NoopReporter))
    }

    /// Creates a transaction reporting to `reporter`.
    pub fn with_reporter(reporter: Arc<dyn BuildReporter>) -> Self {
        Self {
            core: TransactionCore::new(reporter),
            closed: false,
        }
    }

    fn finish(&mut self, body_succeeded: bool) -> Result<(), CloseError> {
        self.closed = true;
        let (committed, close_error) = self.core.finish(body_succeeded);
        if !committed {
            self.core
                .reporter
                .info(|| "Compilation did not succeed; output files are left as written".to_string());
        }
        match close_error {
            Some(e) => Err(CloseError::Caches(e)),
            None => Ok(()),
        }
    }
}

impl Default for NonRecoverableCompilationTransaction {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilationTransaction for NonRecoverableCompilationTransaction {
    fn register_added_or_changed_file(&mut self, _path: &Path) -> Result<(), StashError> {
        Ok(())
    }

    fn delete_file(&mut self, path: &Path) -> Result<(), StashError> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(StashError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
            _ => Ok(()),
        }
    }

    fn mark_as_successful(&mut self) {
        self.core.mark_as_successful();
    }

    fn is_successful(&self) -> bool {
        self.core.is_successful()
    }

    fn set_caches_manager(&mut self, caches: Box<dyn CachesManager>) {
        self.core.set_caches_manager(caches);
    }

    fn register_in_memory_storage_wrapper(&mut self, wrapper: Arc<dyn InMemoryStorageWrapper>) {
        self.core.register_wrapper(wrapper);
    }

    fn close(mut self, body_succeeded: bool) -> Result<(), CloseError> {
        self.finish(body_succeeded)
    }
}

impl Drop for NonRecoverableCompilationTransaction {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!("compilation transaction dropped without run_within; rolling back");
            if let Err(e) = self.finish(false) {
                tracing::error!(error = %e, "rollback of a dropped transaction failed");
            }
        }
    }
}
