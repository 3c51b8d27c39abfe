//! A persistent map that can buffer its mutations in memory.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use ictx_common::InMemoryStorageWrapper;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CacheError;
use crate::map::PersistentMap;

struct State<V> {
    persisted: PersistentMap<V>,
    /// `None` marks a pending removal.
    pending: BTreeMap<String, Option<V>>,
}

/// A [`PersistentMap`] whose writes are either buffered or written through.
///
/// In buffered mode, [`insert`](Self::insert) and [`remove`](Self::remove)
/// only touch a pending layer, reads see the pending layer first, and
/// [`flush`](Self::flush) applies and saves it.
/// [`reset_in_memory_changes`](InMemoryStorageWrapper::reset_in_memory_changes)
/// drops the pending layer, leaving the map as it was last flushed.
///
/// In write-through mode every mutation is saved immediately and there is
/// nothing to reset.
pub struct InMemoryMap<V> {
    name: String,
    buffered: bool,
    state: Mutex<State<V>>,
}

impl<V> InMemoryMap<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    /// Opens the map `name` in `cache_dir`.
    pub fn open(cache_dir: &Path, name: &str, buffered: bool) -> Self {
        Self {
            name: name.to_string(),
            buffered,
            state: Mutex::new(State {
                persisted: PersistentMap::load(cache_dir, name),
                pending: BTreeMap::new(),
            }),
        }
    }

    /// The map name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if mutations are buffered until [`flush`](Self::flush).
    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    /// Returns the current value for `key`, including pending changes.
    pub fn get(&self, key: &str) -> Option<V> {
        let state = self.lock();
        match state.pending.get(key) {
            Some(pending) => pending.clone(),
            None => state.persisted.get(key).cloned(),
        }
    }

    /// Returns every key currently present, including pending changes, in
    /// key order.
    pub fn keys(&self) -> Vec<String> {
        let state = self.lock();
        let mut keys: Vec<String> = state
            .persisted
            .iter()
            .map(|(key, _)| key)
            .filter(|key| !matches!(state.pending.get(key.as_str()), Some(None)))
            .cloned()
            .collect();
        keys.extend(
            state
                .pending
                .iter()
                .filter(|(key, value)| value.is_some() && state.persisted.get(key).is_none())
                .map(|(key, _)| key.clone()),
        );
        keys.sort();
        keys
    }

    /// Stores `value` under `key`.
    pub fn insert(&self, key: impl Into<String>, value: V) -> Result<(), CacheError> {
        self.mutate(key.into(), Some(value))
    }

    /// Removes `key`.
    pub fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.mutate(key.to_string(), None)
    }

    /// Number of buffered mutations not yet flushed.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Applies buffered mutations and saves the map.
    pub fn flush(&self) -> Result<(), CacheError> {
        let mut state = self.lock();
        let pending = std::mem::take(&mut state.pending);
        let changed = !pending.is_empty();
        for (key, value) in pending {
            apply(&mut state.persisted, key, value);
        }
        if changed {
            state.persisted.save()?;
        }
        Ok(())
    }

    fn mutate(&self, key: String, value: Option<V>) -> Result<(), CacheError> {
        let mut state = self.lock();
        if self.buffered {
            state.pending.insert(key, value);
            Ok(())
        } else {
            apply(&mut state.persisted, key, value);
            state.persisted.save()
        }
    }
}

impl<V> InMemoryMap<V> {
    fn lock(&self) -> MutexGuard<'_, State<V>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn apply<V>(map: &mut PersistentMap<V>, key: String, value: Option<V>) {
    match value {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}

impl<V> InMemoryStorageWrapper for InMemoryMap<V> {
    fn reset_in_memory_changes(&self) {
        let mut state = self.lock();
        if !state.pending.is_empty() {
            tracing::debug!(map = %self.name, discarded = state.pending.len(), "resetting cache map");
        }
        state.pending.clear();
    }
}
