//! SQLite-backed key-value store.
//!
//! All logical stores share one `kv` table, partitioned by store name.
//! Writes are committed immediately, so `save()` has nothing to flush.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::KvStore;
use crate::error::StorageError;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    name: String,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and serve the store `name`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path, name: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|e| StorageError::OpenFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        conn.busy_timeout(Duration::from_secs(2))?;
        Self::with_connection(conn, name)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory(name: &str) -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, name)
    }

    fn with_connection(conn: Connection, name: &str) -> Result<Self, StorageError> {
        let store = Self {
            conn: Mutex::new(conn),
            name: name.to_string(),
        };
        store.migrate()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Locked)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                store      TEXT NOT NULL,
                key        TEXT NOT NULL,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (store, key)
            );",
        )?;
        Ok(())
    }
}

impl KvStore for SqliteStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM kv WHERE store = ?1 AND key = ?2",
                params![self.name, key],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|s| serde_json::from_str(&s).map_err(StorageError::from))
            .transpose()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let json = serde_json::to_string(&value)?;
        self.conn()?.execute(
            "INSERT INTO kv (store, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(store, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![self.name, key, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(String, Value)>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM kv WHERE store = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![self.name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (key, raw) = row?;
            match serde_json::from_str(&raw) {
                Ok(value) => entries.push((key, value)),
                Err(err) => {
                    tracing::warn!(store = %self.name, key = %key, error = %err, "skipping unreadable entry");
                }
            }
        }
        Ok(entries)
    }

    fn save(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kv_round_trip() {
        let store = SqliteStore::open_memory("preferences").unwrap();
        assert!(store.get("focusMinutes").unwrap().is_none());
        store.set("focusMinutes", json!(45)).unwrap();
        assert_eq!(store.get("focusMinutes").unwrap(), Some(json!(45)));

        store.set("focusMinutes", json!(50)).unwrap();
        assert_eq!(store.get("focusMinutes").unwrap(), Some(json!(50)));
    }

    #[test]
    fn stores_are_partitioned_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focalite.db");
        let prefs = SqliteStore::open(&path, "preferences").unwrap();
        let progress = SqliteStore::open(&path, "progress").unwrap();

        prefs.set("autoLoop", json!(true)).unwrap();
        progress.set("2024-03-15", json!({"sessionsCompleted": 2})).unwrap();

        assert_eq!(prefs.entries().unwrap().len(), 1);
        assert_eq!(progress.entries().unwrap()[0].0, "2024-03-15");
        assert!(progress.get("autoLoop").unwrap().is_none());
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focalite.db");
        {
            let store = SqliteStore::open(&path, "progress").unwrap();
            store.set("2024-03-16", json!({"breaksCompleted": 1})).unwrap();
        }
        let store = SqliteStore::open(&path, "progress").unwrap();
        assert_eq!(
            store.get("2024-03-16").unwrap(),
            Some(json!({"breaksCompleted": 1}))
        );
    }
}
