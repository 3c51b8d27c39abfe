//! A key-value cache persisted as one JSON file.
//!
//! A map named `lookups` lives at `<cache_dir>/lookups.json`. Keys are strings
//! (typically source paths or symbol names); values are any serde type.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CacheError;

/// Returns the file backing the map `name` in `cache_dir`.
pub fn map_path(cache_dir: &Path, name: &str) -> PathBuf {
    cache_dir.join(format!("{name}.json"))
}

/// A string-keyed map that is read from and written to a JSON file.
#[derive(Debug, Clone)]
pub struct PersistentMap<V> {
    path: PathBuf,
    entries: BTreeMap<String, V>,
}

impl<V> PersistentMap<V>
where
    V: Serialize + DeserializeOwned,
{
    /// Loads the map `name` from `cache_dir`.
    ///
    /// This is fail-safe: a missing or corrupt file loads as an empty map.
    pub fn load(cache_dir: &Path, name: &str) -> Self {
        let path = map_path(cache_dir, name);
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::debug!(path = %path.display(), error = %e, "discarding corrupt cache map");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    /// Writes the map to its file, creating the cache directory if needed.
    pub fn save(&self) -> Result<(), CacheError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| CacheError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| {
            CacheError::Serialization {
                reason: e.to_string(),
            }
        })?;
        std::fs::write(&self.path, json).map_err(|e| CacheError::Io {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl<V> PersistentMap<V> {
    /// The file backing this map.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    /// Stores `value` under `key`, returning the previous value.
    pub fn insert(&mut self, key: String, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.entries.iter()
    }
}
