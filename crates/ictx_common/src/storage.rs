//! The in-memory storage wrapper collaborator reset on rollback.

use std::sync::Arc;

/// A cache shard that buffers mutations in memory before persisting them.
///
/// A transaction keeps every wrapper registered with it and calls
/// [`reset_in_memory_changes`](Self::reset_in_memory_changes) on each of them
/// when the compilation does not commit. A committed transaction leaves the
/// buffered changes alone; persisting them is the caches manager's job.
pub trait InMemoryStorageWrapper {
    /// Discards all pending in-memory mutations.
    fn reset_in_memory_changes(&self);
}

impl<T: InMemoryStorageWrapper + ?Sized> InMemoryStorageWrapper for Arc<T> {
    fn reset_in_memory_changes(&self) {
        (**self).reset_in_memory_changes()
    }
}
