//! Reference incremental caches for the compilation transaction.
//!
//! Each cache is a named key-value map persisted as JSON in the cache
//! directory. With in-memory mode enabled, mutations are buffered until the
//! [`CacheManager`] is closed, so a transaction can discard them on rollback
//! through the [`InMemoryStorageWrapper`](ictx_common::InMemoryStorageWrapper)
//! handles the manager exposes.

#![warn(missing_docs)]

pub mod error;
pub mod manager;
pub mod map;
pub mod memory;

pub use error::CacheError;
pub use manager::CacheManager;
pub use map::PersistentMap;
pub use memory::InMemoryMap;
