//! Key-value storage used for session state, caches and history.
//!
//! Values are opaque JSON blobs under fixed keys. Callers always re-read a key
//! before writing it back; there are no locks held across operations, and the last
//! writer wins.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{LensError, Result};

/// Host key-value storage (session or durable local)
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Read and deserialize a key; a malformed blob reads as absent
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(value) => match serde_json::from_value(value) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::debug!(key, error = %e, "ignoring malformed stored value");
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

pub fn set_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    store.set(key, serde_json::to_value(value)?)
}

/// Per-launch in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, serde_json::Value>>> {
        self.values
            .lock()
            .map_err(|_| LensError::HostError("session store lock poisoned".into()))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        pages: u32,
    }

    #[test]
    fn test_memory_round_trip() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        set_json(&store, "k", &Entry { pages: 3 }).unwrap();
        assert_eq!(get_json::<Entry>(&store, "k").unwrap(), Some(Entry { pages: 3 }));
        store.remove("k").unwrap();
        assert_eq!(get_json::<Entry>(&store, "k").unwrap(), None);
    }

    #[test]
    fn test_malformed_value_reads_as_absent() {
        let store = MemoryStore::new();
        store.set("k", serde_json::json!("not an entry")).unwrap();
        assert_eq!(get_json::<Entry>(&store, "k").unwrap(), None);
    }
}
