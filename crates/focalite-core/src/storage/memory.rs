use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;

use super::KvStore;
use crate::error::StorageError;

/// Volatile store; last resort when nothing on disk is usable, and the
/// default backing for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    cache: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cache: Mutex::new(BTreeMap::new()),
        }
    }

    /// Seed a store with entries.
    pub fn with_entries<I, K>(name: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let store = Self::new(name);
        if let Ok(mut cache) = store.cache.lock() {
            cache.extend(entries.into_iter().map(|(k, v)| (k.into(), v)));
        }
        store
    }
}

impl KvStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let cache = self.cache.lock().map_err(|_| StorageError::Locked)?;
        Ok(cache.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut cache = self.cache.lock().map_err(|_| StorageError::Locked)?;
        cache.insert(key.to_string(), value);
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(String, Value)>, StorageError> {
        let cache = self.cache.lock().map_err(|_| StorageError::Locked)?;
        Ok(cache.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    fn save(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
