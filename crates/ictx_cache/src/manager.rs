//! The set of caches used by one compilation.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use ictx_common::{BoxError, CachesManager, InMemoryStorageWrapper};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CacheError;
use crate::memory::InMemoryMap;

trait Flush: Send + Sync {
    fn flush(&self) -> Result<(), CacheError>;
}

impl<V> Flush for InMemoryMap<V>
where
    V: Serialize + DeserializeOwned + Clone + Send,
{
    fn flush(&self) -> Result<(), CacheError> {
        InMemoryMap::flush(self)
    }
}

struct OpenMap {
    name: String,
    flush: Arc<dyn Flush>,
    wrapper: Arc<dyn InMemoryStorageWrapper + Send + Sync>,
}

#[derive(Default)]
struct Maps {
    open: Vec<OpenMap>,
    closed: bool,
}

/// Opens the named cache maps of a cache directory and flushes them on close.
///
/// With `keep_in_memory` enabled every map buffers its mutations, and
/// [`in_memory_wrappers`](Self::in_memory_wrappers) returns the handles a
/// transaction needs to discard them on rollback. Closing flushes every map,
/// so a rolled-back transaction must reset the wrappers before closing.
pub struct CacheManager {
    dir: PathBuf,
    keep_in_memory: bool,
    maps: Mutex<Maps>,
}

impl CacheManager {
    /// Creates a manager over `dir`. Nothing is read until a map is opened.
    pub fn open(dir: &Path, keep_in_memory: bool) -> Self {
        Self {
            dir: dir.to_path_buf(),
            keep_in_memory,
            maps: Mutex::new(Maps::default()),
        }
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns `true` if maps buffer their mutations in memory.
    pub fn keeps_in_memory(&self) -> bool {
        self.keep_in_memory
    }

    /// Opens the map `name`. Each name may be opened once per manager.
    pub fn map<V>(&self, name: &str) -> Result<Arc<InMemoryMap<V>>, CacheError>
    where
        V: Serialize + DeserializeOwned + Clone + Send + 'static,
    {
        let mut maps = self.lock();
        if maps.closed {
            return Err(CacheError::Closed);
        }
        if maps.open.iter().any(|m| m.name == name) {
            return Err(CacheError::AlreadyOpen {
                name: name.to_string(),
            });
        }
        let map = Arc::new(InMemoryMap::open(&self.dir, name, self.keep_in_memory));
        maps.open.push(OpenMap {
            name: name.to_string(),
            flush: map.clone(),
            wrapper: map.clone(),
        });
        Ok(map)
    }

    /// Handles for discarding buffered changes of every open map.
    ///
    /// Empty when `keep_in_memory` is off, since write-through maps have
    /// nothing to discard.
    pub fn in_memory_wrappers(&self) -> Vec<Arc<dyn InMemoryStorageWrapper + Send + Sync>> {
        if !self.keep_in_memory {
            return Vec::new();
        }
        self.lock().open.iter().map(|m| m.wrapper.clone()).collect()
    }

    /// Flushes every open map and closes the manager. Closing again is a
    /// no-op.
    ///
    /// Every map is flushed even if an earlier one fails; the first failure
    /// is returned.
    pub fn close_maps(&self) -> Result<(), CacheError> {
        let mut maps = self.lock();
        if maps.closed {
            return Ok(());
        }
        maps.closed = true;
        let mut first_error = None;
        for map in maps.open.drain(..) {
            if let Err(e) = map.flush.flush() {
                tracing::warn!(map = %map.name, error = %e, "failed to flush cache map");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn lock(&self) -> MutexGuard<'_, Maps> {
        self.maps.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CachesManager for CacheManager {
    fn close(&self) -> Result<(), BoxError> {
        self.close_maps().map_err(BoxError::from)
    }
}
