//! # Focalite Core Library
//!
//! Core logic for the Focalite focus timer: a focus/break countdown with
//! optional auto-looping, persisted user preferences and per-day progress
//! history. Front ends (the `focalite` CLI, or anything else) own a
//! [`FocusApp`] and drive it with periodic ticks.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine that requires the caller
//!   to periodically invoke `tick()` to detect phase completion
//! - **Preferences**: Validated, clamped user settings persisted key by key
//! - **Progress**: Per-day counters with midnight rollover and throttled autosave
//! - **Storage**: Named key-value stores backed by SQLite, a JSON file or memory,
//!   plus TOML-based application configuration
//! - **Services**: Best-effort break notifications and sound cues
//!
//! ## Key Components
//!
//! - [`FocusApp`]: Application context tying the pieces together
//! - [`TimerEngine`]: Core timer state machine
//! - [`PreferencesStore`]: Preference access and persistence
//! - [`ProgressStore`]: Daily progress persistence and history
//! - [`KvStore`]: Trait implemented by every storage backend

pub mod app;
pub mod clock;
pub mod error;
pub mod events;
pub mod preferences;
pub mod progress;
pub mod services;
pub mod storage;
pub mod store_utils;
pub mod timer;

pub use app::FocusApp;
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{ConfigError, CoreError, Result, ServiceError, StorageError, ValidationError};
pub use events::Event;
pub use preferences::{Preferences, PreferencesStore};
pub use progress::{DailyProgress, ProgressStore, ProgressSummary, WindowOptions};
pub use services::{
    CommandPlayer, LogNotifier, NotificationService, NotificationSink, SilentPlayer, SoundCue,
    SoundPlayer, SoundService,
};
pub use storage::{data_dir, open_store, Config, KvStore, SharedStore, StorageBackend};
pub use timer::{DayCounters, TimerEngine, TimerPhase};
