//! The caches manager collaborator owned and closed by a transaction.

use std::sync::Arc;

/// Boxed error returned by collaborators whose failure type is opaque to the
/// transaction.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A handle over the on-disk incremental caches of one compilation.
///
/// The build driver hands the manager to a transaction, which closes it exactly
/// once during cleanup. The compilation body usually keeps its own handle
/// (for example an `Arc` clone) for reads and writes while the body runs.
pub trait CachesManager {
    /// Flushes and releases the caches.
    ///
    /// A failure here means cache bookkeeping did not persist cleanly. The
    /// transaction surfaces it as a dedicated close error, never as a plain
    /// body failure.
    fn close(&self) -> Result<(), BoxError>;
}

impl<T: CachesManager + ?Sized> CachesManager for Arc<T> {
    fn close(&self) -> Result<(), BoxError> {
        (**self).close()
    }
}

impl<T: CachesManager + ?Sized> CachesManager for Box<T> {
    fn close(&self) -> Result<(), BoxError> {
        (**self).close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCaches {
        closes: AtomicUsize,
        fail: bool,
    }

    impl CachesManager for CountingCaches {
        fn close(&self) -> Result<(), BoxError> {
            self.closes.fetch_add(1, Ordering::Relaxed);
            if self.fail {
                return Err("disk full".into());
            }
            Ok(())
        }
    }

    #[test]
    fn arc_forwards_close() {
        let caches = Arc::new(CountingCaches {
            closes: AtomicUsize::new(0),
            fail: false,
        });
        let handle: Box<dyn CachesManager> = Box::new(Arc::clone(&caches));
        handle.close().unwrap();
        assert_eq!(caches.closes.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn close_error_is_preserved() {
        let caches = CountingCaches {
            closes: AtomicUsize::new(0),
            fail: true,
        };
        let boxed: Box<CountingCaches> = Box::new(caches);
        let err = boxed.close().unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }
}
