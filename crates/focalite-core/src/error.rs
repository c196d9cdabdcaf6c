//! Core error types for focalite-core.
//!
//! Nothing in the timer or the stores is fatal: most of these errors are
//! logged and swallowed at the store boundary. They still flow as typed
//! values so that the storage backends and the CLI can report them.
//! [`CoreError`] is the error type of front-end commands, which propagate
//! the specific errors below with `?`.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focalite-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Key-value storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage backend errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing store
    #[error("Failed to open store at {path}: {message}")]
    OpenFailed { path: PathBuf, message: String },

    /// SQLite query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// File-system failure in a file-backed store
    #[error("Store IO failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be (de)serialized
    #[error("Store serialization failed: {0}")]
    Serialization(String),

    /// The store's lock was poisoned or the database is locked
    #[error("Store is locked")]
    Locked,

    /// Injected failure (used by test doubles)
    #[error("{0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors raised at setter boundaries.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Unknown preference key
    #[error("unknown preference key: {0}")]
    UnknownKey(String),
}

/// Notification and sound playback errors.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The platform refused or failed to show a notification
    #[error("Notification failed: {0}")]
    Notification(String),

    /// A sound source could not be played
    #[error("Failed to play '{source_name}': {message}")]
    Playback {
        source_name: String,
        message: String,
    },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                StorageError::Locked
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
