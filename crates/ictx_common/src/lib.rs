//! Shared foundational types used across the ictx workspace.
//!
//! This crate provides content hashing for stashed backups and the two
//! collaborator interfaces a compilation transaction drives: the caches manager
//! it closes and the in-memory storage wrappers it resets on rollback.

#![warn(missing_docs)]

pub mod caches;
pub mod hash;
pub mod storage;

pub use caches::{BoxError, CachesManager};
pub use hash::ContentHash;
pub use storage::InMemoryStorageWrapper;
