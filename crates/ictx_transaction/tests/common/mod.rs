//! Test doubles and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ictx_common::{BoxError, CachesManager, InMemoryStorageWrapper};
use ictx_report::RecordingReporter;
use ictx_transaction::{
    NonRecoverableCompilationTransaction, RecoverableCompilationTransaction, StashError,
};

/// A caches manager that counts how often it is closed.
#[derive(Default)]
pub struct CountingCaches {
    closes: AtomicUsize,
    fail: bool,
}

impl CountingCaches {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            closes: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl CachesManager for CountingCaches {
    fn close(&self) -> Result<(), BoxError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err("caches are locked by another process".into());
        }
        Ok(())
    }
}

/// An in-memory wrapper that counts resets.
#[derive(Default)]
pub struct CountingWrapper {
    resets: AtomicUsize,
}

impl CountingWrapper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl InMemoryStorageWrapper for CountingWrapper {
    fn reset_in_memory_changes(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// The error type of the compilation bodies under test.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Stash(#[from] StashError),
    #[error(transparent)]
    Cache(#[from] ictx_cache::CacheError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("compilation failed")]
    Compilation,
}

pub fn compilation_failed() -> BuildError {
    BuildError::Compilation
}

pub fn recoverable(dir: &Path) -> RecoverableCompilationTransaction {
    RecoverableCompilationTransaction::new(
        Arc::new(RecordingReporter::new()),
        dir.join("stash"),
    )
}

pub fn non_recoverable(_dir: &Path) -> NonRecoverableCompilationTransaction {
    NonRecoverableCompilationTransaction::with_reporter(Arc::new(RecordingReporter::new()))
}
