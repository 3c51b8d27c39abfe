//! The transaction protocol shared by both variants.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use ictx_common::{CachesManager, InMemoryStorageWrapper};
use ictx_report::{BuildReporter, BuildTime, ReportLevel, ReporterExt};

use crate::error::{CachesManagerCloseError, CloseError, StashError, TransactionError};

/// One compilation attempt with all-or-nothing effects on outputs and caches.
///
/// The body passed to [`run_within`](Self::run_within) performs the
/// compilation. It must call
/// [`register_added_or_changed_file`](Self::register_added_or_changed_file)
/// before creating or overwriting any output file, and delete outputs only
/// through [`delete_file`](Self::delete_file). The transaction commits only if
/// the body returns `Ok` after calling
/// [`mark_as_successful`](Self::mark_as_successful); every other exit,
/// including a panic, rolls back.
///
/// A transaction is single-threaded: it must not be shared across threads
/// while the body runs.
pub trait CompilationTransaction {
    /// Announces that `path` is about to be created or overwritten.
    ///
    /// Must be called before the write. Registering the same path again is a
    /// no-op for staging purposes.
    fn register_added_or_changed_file(&mut self, path: &Path) -> Result<(), StashError>;

    /// Deletes `path` as part of the transaction. Deleting a missing file is
    /// not an error.
    fn delete_file(&mut self, path: &Path) -> Result<(), StashError>;

    /// Marks the compilation output as good. Idempotent.
    fn mark_as_successful(&mut self);

    /// Returns `true` once [`mark_as_successful`](Self::mark_as_successful)
    /// has been called.
    fn is_successful(&self) -> bool;

    /// Hands the caches manager to the transaction, which closes it during
    /// cleanup. Set at most once per transaction.
    fn set_caches_manager(&mut self, caches: Box<dyn CachesManager>);

    /// Tracks an in-memory cache shard whose pending changes are discarded on
    /// rollback. Registering the same wrapper twice is harmless.
    fn register_in_memory_storage_wrapper(&mut self, wrapper: Arc<dyn InMemoryStorageWrapper>);

    /// Runs the cleanup phase and ends the transaction.
    ///
    /// `body_succeeded` tells whether the compilation body completed without
    /// error. Called by [`run_within`](Self::run_within); calling it directly
    /// bypasses the panic handling there.
    fn close(self, body_succeeded: bool) -> Result<(), CloseError>
    where
        Self: Sized;

    /// Runs `body` under this transaction, then commits or rolls back.
    ///
    /// Cleanup runs on every exit path. If `body` panics, the transaction rolls
    /// back and the panic is resumed afterwards.
    fn run_within<R, E, F>(self, body: F) -> Result<R, TransactionError<E>>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<R, E>,
    {
        run_within(self, body)
    }

    /// Like [`run_within`](Self::run_within), but passes any failure to
    /// `handler`, which may turn it into a value or return it unchanged.
    fn run_within_or_else<R, E, F, H>(self, body: F, handler: H) -> Result<R, TransactionError<E>>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<R, E>,
        H: FnOnce(TransactionError<E>) -> Result<R, TransactionError<E>>,
    {
        run_within(self, body).or_else(handler)
    }
}

fn run_within<T, R, E, F>(mut transaction: T, body: F) -> Result<R, TransactionError<E>>
where
    T: CompilationTransaction,
    F: FnOnce(&mut T) -> Result<R, E>,
{
    let result = match panic::catch_unwind(AssertUnwindSafe(|| body(&mut transaction))) {
        Ok(result) => result,
        Err(payload) => {
            if let Err(e) = transaction.close(false) {
                tracing::error!(error = %e, "cleanup after a panicking compilation failed");
            }
            panic::resume_unwind(payload);
        }
    };
    match transaction.close(result.is_ok()) {
        Ok(()) => result.map_err(TransactionError::Body),
        Err(close) => Err(TransactionError::from_close(close, result.err())),
    }
}

/// Bookkeeping shared by both transaction variants: the success flag, the
/// caches manager, and the registered in-memory wrappers.
pub(crate) struct TransactionCore {
    successful: bool,
    caches_manager: Option<Box<dyn CachesManager>>,
    wrappers: Vec<Arc<dyn InMemoryStorageWrapper>>,
    pub(crate) reporter: Arc<dyn BuildReporter>,
}

impl TransactionCore {
    pub(crate) fn new(reporter: Arc<dyn BuildReporter>) -> Self {
        Self {
            successful: false,
            caches_manager: None,
            wrappers: Vec::new(),
            reporter,
        }
    }

    pub(crate) fn mark_as_successful(&mut self) {
        self.successful = true;
    }

    pub(crate) fn is_successful(&self) -> bool {
        self.successful
    }

    pub(crate) fn set_caches_manager(&mut self, caches: Box<dyn CachesManager>) {
        debug_assert!(
            self.caches_manager.is_none(),
            "the caches manager is set at most once per transaction"
        );
        self.caches_manager = Some(caches);
    }

    pub(crate) fn register_wrapper(&mut self, wrapper: Arc<dyn InMemoryStorageWrapper>) {
        if !self.wrappers.iter().any(|w| Arc::ptr_eq(w, &wrapper)) {
            self.wrappers.push(wrapper);
        }
    }

    /// Runs the cleanup steps common to both variants and returns whether the
    /// transaction commits, along with a caches close failure if one occurred.
    ///
    /// In-memory wrappers are reset before the caches manager closes, so the
    /// discarded changes are never flushed. A close failure forces a rollback
    /// of the output files even if the body succeeded.
    pub(crate) fn finish(&mut self, body_succeeded: bool) -> (bool, Option<CachesManagerCloseError>) {
        let committed = self.successful && body_succeeded;
        if !committed {
            self.reset_wrappers();
        }
        let close_error = self.close_caches().err();
        if let Some(e) = &close_error {
            self.reporter.report(ReportLevel::Error, &e.to_string());
            tracing::warn!(error = %e, "caches manager failed to close");
        }
        (committed && close_error.is_none(), close_error)
    }

    fn reset_wrappers(&self) {
        if self.wrappers.is_empty() {
            return;
        }
        self.reporter.measure(BuildTime::ResetInMemoryCaches, || {
            self.reporter.debug(|| {
                format!("Resetting {} in-memory cache wrappers", self.wrappers.len())
            });
            for wrapper in &self.wrappers {
                wrapper.reset_in_memory_changes();
            }
        });
    }

    fn close_caches(&mut self) -> Result<(), CachesManagerCloseError> {
        let Some(caches) = self.caches_manager.take() else {
            return Ok(());
        };
        self.reporter
            .measure(BuildTime::CloseCaches, || caches.close())
            .map_err(|source| CachesManagerCloseError { source })
    }
}
