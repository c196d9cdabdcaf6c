//! Key-value persistence.
//!
//! Preferences, daily progress and the CLI's transient timer state all live
//! in named key-value stores. Values are JSON. Which backend serves a store
//! is decided once at startup by [`open_store`]: SQLite when the data
//! directory can host a database, otherwise a JSON file, otherwise memory.

mod config;
mod json_file;
mod memory;
mod sqlite;

pub use config::{
    Config, NotificationsConfig, SoundsConfig, StatsConfig, StorageConfig, TimerConfig,
};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StorageError;

/// Database file shared by every SQLite-backed store.
pub const DATABASE_FILE: &str = "focalite.db";

/// A named key-value store.
///
/// Implementations serialize their own writes, so a store can be shared
/// between owners behind an `Arc`.
pub trait KvStore: Send + Sync {
    /// Logical store name ("preferences", "progress", ...).
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Every entry in one batch, ordered by key.
    fn entries(&self) -> Result<Vec<(String, Value)>, StorageError>;

    /// Flush pending writes to durable storage.
    fn save(&self) -> Result<(), StorageError>;
}

pub type SharedStore = Arc<dyn KvStore>;

/// Which backend to use for the named stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Try SQLite, then a JSON file, then memory.
    #[default]
    Auto,
    Sqlite,
    Json,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "sqlite" => Ok(Self::Sqlite),
            "json" => Ok(Self::Json),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

/// Returns the data directory, creating it if needed.
///
/// `FOCALITE_DATA_DIR` overrides the location. Otherwise this is
/// `~/.config/focalite`, or `~/.config/focalite-dev` when `FOCALITE_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("FOCALITE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCALITE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focalite-dev")
            } else {
                base_dir.join("focalite")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Open the named store in `dir` with the requested backend.
///
/// Never fails: a backend that cannot be opened is logged and the next one
/// in the fallback order is tried, ending with an in-memory store.
pub fn open_store(dir: &Path, name: &str, backend: StorageBackend) -> SharedStore {
    if matches!(backend, StorageBackend::Auto | StorageBackend::Sqlite) {
        match SqliteStore::open(&dir.join(DATABASE_FILE), name) {
            Ok(store) => {
                tracing::debug!(store = name, "using sqlite store");
                return Arc::new(store);
            }
            Err(err) => {
                tracing::warn!(store = name, error = %err, "sqlite store unavailable, falling back");
            }
        }
    }

    if matches!(
        backend,
        StorageBackend::Auto | StorageBackend::Sqlite | StorageBackend::Json
    ) {
        match JsonFileStore::open(&dir.join(format!("{name}.json")), name) {
            Ok(store) => {
                tracing::debug!(store = name, "using json file store");
                return Arc::new(store);
            }
            Err(err) => {
                tracing::warn!(store = name, error = %err, "json store unavailable, falling back");
            }
        }
    }

    tracing::debug!(store = name, "using in-memory store");
    Arc::new(MemoryStore::new(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("SQLite".parse::<StorageBackend>(), Ok(StorageBackend::Sqlite));
        assert_eq!("json".parse::<StorageBackend>(), Ok(StorageBackend::Json));
        assert!("redis".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn open_store_prefers_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), "preferences", StorageBackend::Auto);
        store.set("focusMinutes", Value::from(25)).unwrap();
        store.save().unwrap();
        assert!(dir.path().join(DATABASE_FILE).exists());
        assert!(!dir.path().join("preferences.json").exists());
    }

    #[test]
    fn open_store_falls_back_to_json_when_sqlite_cannot_open() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the database file should be makes SQLite fail.
        std::fs::create_dir(dir.path().join(DATABASE_FILE)).unwrap();

        let store = open_store(dir.path(), "progress", StorageBackend::Auto);
        store.set("2024-03-15", serde_json::json!({"sessionsCompleted": 1})).unwrap();
        store.save().unwrap();
        assert!(dir.path().join("progress.json").exists());
    }

    #[test]
    fn memory_backend_touches_nothing_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), "state", StorageBackend::Memory);
        store.set("k", Value::Bool(true)).unwrap();
        store.save().unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
