//! JSON-file fallback store.
//!
//! The whole store is one JSON object cached in memory. `set` only touches
//! the cache; `save` rewrites the file through a temp file and rename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use super::KvStore;
use crate::error::StorageError;

pub struct JsonFileStore {
    path: PathBuf,
    name: String,
    cache: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    /// Load the store from `path`. A missing file is an empty store; an
    /// unreadable one is logged and treated as empty.
    ///
    /// # Errors
    /// Returns an error if the parent directory is not writable.
    pub fn open(path: &Path, name: &str) -> Result<Self, StorageError> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let meta = std::fs::metadata(parent).map_err(|e| StorageError::OpenFailed {
            path: parent.to_path_buf(),
            message: e.to_string(),
        })?;
        if !meta.is_dir() || meta.permissions().readonly() {
            return Err(StorageError::OpenFailed {
                path: parent.to_path_buf(),
                message: "not a writable directory".into(),
            });
        }

        let cache = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, Value>>(&content) {
                Ok(map) => map,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "discarding corrupt store file");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            name: name.to_string(),
            cache: Mutex::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cache(&self) -> Result<MutexGuard<'_, BTreeMap<String, Value>>, StorageError> {
        self.cache.lock().map_err(|_| StorageError::Locked)
    }
}

impl KvStore for JsonFileStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.cache()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.cache()?.insert(key.to_string(), value);
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(String, Value)>, StorageError> {
        Ok(self
            .cache()?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn save(&self) -> Result<(), StorageError> {
        // Hold the lock across the write so saves are serialized.
        let cache = self.cache()?;
        let content = serde_json::to_string_pretty(&*cache)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
