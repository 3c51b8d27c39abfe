//! A transaction that restores output files on failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ictx_common::{CachesManager, InMemoryStorageWrapper};
use ictx_report::{BuildReporter, ReportLevel, ReporterExt};

use crate::error::{CloseError, StashError};
use crate::stash::StashArea;
use crate::transaction::{CompilationTransaction, TransactionCore};

/// A transaction that stages every output mutation through a [`StashArea`].
///
/// On rollback each modified or deleted file gets its pre-transaction bytes
/// back and each newly created file is removed. The stash directory is removed
/// when the transaction ends, unless a restore failed: then
/// [`StashArea::discard`] is skipped and the directory outlives the
/// transaction, so the remaining backups can be recovered by hand. The
/// returned [`CloseError::Stash`] names the failing file.
pub struct RecoverableCompilationTransaction {
    core: TransactionCore,
    stash: StashArea,
    closed: bool,
}

impl RecoverableCompilationTransaction {
    /// Creates a transaction stashing into `stash_dir`, which must be empty or
    /// absent and owned exclusively by this transaction.
    pub fn new(reporter: Arc<dyn BuildReporter>, stash_dir: PathBuf) -> Self {
        let stash = StashArea::new(stash_dir, Arc::clone(&reporter));
        Self::from_stash(reporter, stash)
    }

    /// Creates a transaction over an existing stash area.
    pub fn from_stash(reporter: Arc<dyn BuildReporter>, stash: StashArea) -> Self {
        Self {
            core: TransactionCore::new(reporter),
            stash,
            closed: false,
        }
    }

    /// Creates a transaction stashing into a fresh directory named
    /// `<prefix>XXXXXX` under `root` (the system temp directory if `None`).
    pub fn in_temp_dir(
        reporter: Arc<dyn BuildReporter>,
        root: Option<&Path>,
        prefix: &str,
    ) -> Result<Self, StashError> {
        let stash = StashArea::in_temp_dir(root, prefix, Arc::clone(&reporter))?;
        Ok(Self::from_stash(reporter, stash))
    }

    /// The stash directory of this transaction.
    pub fn stash_dir(&self) -> &Path {
        self.stash.dir()
    }

    /// The stash area, for inspection.
    pub fn stash(&self) -> &StashArea {
        &self.stash
    }

    fn finish(&mut self, body_succeeded: bool) -> Result<(), CloseError> {
        self.closed = true;
        let (committed, close_error) = self.core.finish(body_succeeded);
        let reporter = Arc::clone(&self.core.reporter);

        let mut stash_error = None;
        if committed {
            reporter.debug(|| format!("Committing {} staged output files", self.stash.len()));
        } else {
            reporter.info(|| format!("Reverting {} output files", self.stash.len()));
            if let Err(e) = self.stash.restore_all() {
                tracing::error!(
                    error = %e,
                    stash = %self.stash.dir().display(),
                    "failed to restore output files; keeping the stash"
                );
                reporter.report(
                    ReportLevel::Error,
                    &format!(
                        "Failed to restore output files ({e}); backups are kept in {}",
                        self.stash.dir().display()
                    ),
                );
                stash_error = Some(e);
            }
        }
        if stash_error.is_none() {
            if let Err(e) = self.stash.discard() {
                tracing::warn!(error = %e, "failed to remove the stash directory");
                stash_error = Some(e);
            }
        }

        match (close_error, stash_error) {
            (Some(close), _) => Err(CloseError::Caches(close)),
            (None, Some(stash)) => Err(CloseError::Stash(stash)),
            (None, None) => Ok(()),
        }
    }
}

impl CompilationTransaction for RecoverableCompilationTransaction {
    fn register_added_or_changed_file(&mut self, path: &Path) -> Result<(), StashError> {
        self.stash.stash(path)
    }

    fn delete_file(&mut self, path: &Path) -> Result<(), StashError> {
        self.stash.delete(path)
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

impl Drop for RecoverableCompilationTransaction {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!("compilation transaction dropped without run_within; rolling back");
            if let Err(e) = self.finish(false) {
                tracing::error!(error = %e, "rollback of a dropped transaction failed");
            }
        }
    }
}
