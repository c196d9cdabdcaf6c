//! Shared command setup: data directory, configuration, stores and the
//! persisted timer.

use std::path::PathBuf;
use std::sync::Arc;

use focalite_core::{
    data_dir, open_store, preferences, progress, CommandPlayer, Config, FocusApp, NotificationService,
    PreferencesStore, Result, SharedClock, SharedStore, SoundService, SystemClock, TimerEngine,
};

use crate::desktop::DesktopNotifier;

/// Store holding CLI-only state between invocations.
const STATE_STORE: &str = "state";
const ENGINE_KEY: &str = "timer_engine";

pub struct Context {
    pub data_dir: PathBuf,
    pub config: Config,
    state: SharedStore,
}

impl Context {
    pub fn load() -> Result<Self> {
        let data_dir = data_dir()?;
        let config = Config::load_from(&data_dir.join("config.toml"))?;
        let state = open_store(&data_dir, STATE_STORE, config.storage.backend);
        Ok(Self {
            data_dir,
            config,
            state,
        })
    }

    pub fn store(&self, name: &str) -> SharedStore {
        open_store(&self.data_dir, name, self.config.storage.backend)
    }

    pub fn preferences(&self) -> PreferencesStore {
        PreferencesStore::load(self.store(preferences::STORE_NAME))
    }

    /// Build the application around the persisted timer, with desktop
    /// notifications and sound cues wired in.
    pub fn app(&self) -> FocusApp {
        let clock: SharedClock = Arc::new(SystemClock);
        let mut app = FocusApp::with_timer(
            clock,
            self.store(preferences::STORE_NAME),
            self.store(progress::STORE_NAME),
            self.load_engine(),
        );

        let autosave_ms = self.config.timer.autosave_secs.saturating_mul(1000);
        app.set_autosave_interval(i64::try_from(autosave_ms).unwrap_or(i64::MAX));

        if self.config.notifications.enabled {
            app.set_notifications(NotificationService::new(Box::new(DesktopNotifier)));
        }
        let sounds_dir = self.config.sounds_dir(&self.data_dir);
        app.set_sounds(SoundService::new(Box::new(CommandPlayer::new(sounds_dir))));
        app
    }

    fn load_engine(&self) -> TimerEngine {
        match self.state.get(ENGINE_KEY) {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "discarding unreadable timer state");
                TimerEngine::default()
            }),
            Ok(None) => TimerEngine::default(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read timer state");
                TimerEngine::default()
            }
        }
    }

    pub fn save_engine(&self, engine: &TimerEngine) -> Result<()> {
        let value = serde_json::to_value(engine)?;
        self.state.set(ENGINE_KEY, value)?;
        self.state.save()?;
        Ok(())
    }
}
