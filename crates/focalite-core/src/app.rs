//! Application context.
//!
//! `FocusApp` owns the clock, timer, preferences, progress and services,
//! and is passed by reference to whatever front end drives it. Every user
//! action returns the events it produced; the context dispatches their side
//! effects (notifications, sounds) before handing them back.

use crate::clock::SharedClock;
use crate::events::Event;
use crate::preferences::{Preferences, PreferencesStore};
use crate::progress::{DailyProgress, ProgressStore, ProgressSummary, WindowOptions};
use crate::services::{NotificationService, SoundService};
use crate::storage::SharedStore;
use crate::timer::TimerEngine;

pub struct FocusApp {
    clock: SharedClock,
    timer: TimerEngine,
    preferences: PreferencesStore,
    progress: ProgressStore,
    notifications: NotificationService,
    sounds: SoundService,
}

impl FocusApp {
    /// Fresh idle timer; preferences and today's counters come from storage.
    pub fn new(clock: SharedClock, preferences: SharedStore, progress: SharedStore) -> Self {
        let timer = TimerEngine::new(clock.clone());
        Self::with_timer(clock, preferences, progress, timer)
    }

    /// Resume a previously persisted timer. Its counters are replaced by
    /// today's stored progress (or zeroed on a new day).
    pub fn with_timer(
        clock: SharedClock,
        preferences: SharedStore,
        progress: SharedStore,
        mut timer: TimerEngine,
    ) -> Self {
        timer.set_clock(clock.clone());
        let preferences = PreferencesStore::load(preferences);
        let mut progress = ProgressStore::new(progress, clock.clone());
        progress.load_today(&mut timer);

        Self {
            clock,
            timer,
            preferences,
            progress,
            notifications: NotificationService::disabled(),
            sounds: SoundService::silent(),
        }
    }

    pub fn set_notifications(&mut self, notifications: NotificationService) {
        self.notifications = notifications;
    }

    pub fn set_sounds(&mut self, sounds: SoundService) {
        self.sounds = sounds;
    }

    /// Replace the progress autosave window (milliseconds).
    pub fn set_autosave_interval(&mut self, ms: i64) {
        self.progress.set_autosave_interval(ms);
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn timer(&self) -> &TimerEngine {
        &self.timer
    }

    pub fn preferences(&self) -> &Preferences {
        self.preferences.get()
    }

    /// Preference edits apply immediately; an in-progress countdown keeps
    /// its locked duration.
    pub fn preferences_mut(&mut self) -> &mut PreferencesStore {
        &mut self.preferences
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn snapshot(&self) -> Event {
        self.timer.snapshot(self.preferences.get())
    }

    pub fn current_progress(&self) -> DailyProgress {
        self.progress.current_progress(&self.timer)
    }

    pub fn history(&self, days: u32) -> Vec<DailyProgress> {
        self.progress.history(days)
    }

    pub fn daily_window(&self, days: u32, options: WindowOptions) -> Vec<DailyProgress> {
        self.progress.daily_window(&self.timer, days, options)
    }

    pub fn summary(&self, days: u32) -> ProgressSummary {
        self.progress.summary(&self.timer, days)
    }

    // ── Actions ──────────────────────────────────────────────────────

    pub fn start_focus(&mut self) -> Vec<Event> {
        let events = self.timer.start_focus(self.preferences.get());
        self.dispatch(events)
    }

    pub fn start_break(&mut self) -> Vec<Event> {
        let events = self.timer.start_break(self.preferences.get());
        self.dispatch(events)
    }

    pub fn start_manual_break(&mut self) -> Vec<Event> {
        let events = self.timer.start_manual_break(self.preferences.get());
        self.dispatch(events)
    }

    pub fn end_break_early(&mut self) -> Vec<Event> {
        let events = self.timer.end_break_early();
        self.dispatch(events)
    }

    pub fn pause(&mut self) -> Vec<Event> {
        let events = self.timer.pause().into_iter().collect();
        self.dispatch(events)
    }

    pub fn resume(&mut self) -> Vec<Event> {
        let events = self.timer.resume().into_iter().collect();
        self.dispatch(events)
    }

    pub fn reset(&mut self) -> Vec<Event> {
        let events = self.timer.reset().into_iter().collect();
        self.dispatch(events)
    }

    /// Countdown tick; call every [`crate::timer::TICK_INTERVAL_MS`].
    pub fn tick(&mut self) -> Vec<Event> {
        let events = self.timer.tick(self.preferences.get());
        self.dispatch(events)
    }

    /// Progress tick; call every [`crate::progress::PROGRESS_TICK_MS`].
    pub fn progress_tick(&mut self) -> Vec<Event> {
        self.progress
            .on_tick(&mut self.timer)
            .into_iter()
            .collect()
    }

    /// Persist today's progress now. Returns `false` if the write failed.
    pub fn flush(&mut self) -> bool {
        self.progress.save(&self.timer)
    }

    fn dispatch(&mut self, events: Vec<Event>) -> Vec<Event> {
        for event in &events {
            match event {
                Event::BreakStarted { .. } => {
                    self.notifications.send_break_start_notification();
                    self.sounds.play_break_start(self.preferences.get());
                }
                Event::BreakCompleted { early: false, .. } => {
                    self.notifications.send_break_end_notification();
                    self.sounds.play_break_end(self.preferences.get());
                }
                _ => {}
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ServiceError;
    use crate::services::{NotificationSink, SoundPlayer};
    use crate::storage::{KvStore, MemoryStore};
    use crate::timer::TimerPhase;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        notes: Mutex<Vec<String>>,
        sounds: Mutex<Vec<String>>,
    }

    impl NotificationSink for Arc<Recorder> {
        fn is_permission_granted(&self) -> bool {
            true
        }

        fn request_permission(&self) -> bool {
            true
        }

        fn send(&self, title: &str, _body: &str) -> Result<(), ServiceError> {
            self.notes.lock().unwrap().push(title.to_string());
            Ok(())
        }
    }

    impl SoundPlayer for Arc<Recorder> {
        fn play(&self, source: &str) -> Result<(), ServiceError> {
            self.sounds.lock().unwrap().push(source.to_string());
            Ok(())
        }
    }

    struct Fixture {
        clock: Arc<ManualClock>,
        progress: Arc<MemoryStore>,
        recorder: Arc<Recorder>,
        app: FocusApp,
    }

    fn fixture(prefs: Vec<(&str, serde_json::Value)>) -> Fixture {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let clock = Arc::new(ManualClock::at(date, 9));
        let prefs = Arc::new(MemoryStore::with_entries("preferences", prefs));
        let progress = Arc::new(MemoryStore::new("progress"));
        let recorder = Arc::new(Recorder::default());

        let mut app = FocusApp::new(clock.clone(), prefs, progress.clone());
        app.set_notifications(NotificationService::new(Box::new(recorder.clone())));
        app.set_sounds(SoundService::new(Box::new(recorder.clone())));
        Fixture {
            clock,
            progress,
            recorder,
            app,
        }
    }

    #[test]
    fn focus_completion_announces_break() {
        let mut f = fixture(vec![("focusMinutes", json!(1)), ("breakMinutes", json!(1))]);
        f.app.start_focus();
        f.clock.advance_secs(60);
        let events = f.app.tick();

        assert!(events
            .iter()
            .any(|e| matches!(e, Event::FocusCompleted { minutes: 1, partial: false, .. })));
        assert_eq!(f.app.timer().phase(), TimerPhase::Break);
        assert_eq!(*f.recorder.notes.lock().unwrap(), vec!["Break Time!"]);
        assert_eq!(*f.recorder.sounds.lock().unwrap(), vec!["break-start.mp3"]);
    }

    #[test]
    fn natural_break_end_announces_focus() {
        let mut f = fixture(vec![("breakMinutes", json!(1))]);
        f.app.start_break();
        f.clock.advance_secs(60);
        f.app.tick();

        assert_eq!(f.app.timer().phase(), TimerPhase::Idle);
        assert_eq!(
            *f.recorder.notes.lock().unwrap(),
            vec!["Break Time!", "Break Over"]
        );
        assert_eq!(
            *f.recorder.sounds.lock().unwrap(),
            vec!["break-start.mp3", "break-end.mp3"]
        );
    }

    #[test]
    fn early_break_end_is_silent() {
        let mut f = fixture(vec![]);
        f.app.start_manual_break();
        f.clock.advance_secs(90);
        f.app.end_break_early();

        assert_eq!(*f.recorder.notes.lock().unwrap(), vec!["Break Time!"]);
        assert_eq!(f.app.timer().breaks_completed(), 1);
        assert_eq!(f.app.timer().total_break_minutes(), 1);
    }

    #[test]
    fn disabled_sound_toggle_skips_cue() {
        let mut f = fixture(vec![("breakStartSound", json!(false))]);
        f.app.start_break();
        assert!(f.recorder.sounds.lock().unwrap().is_empty());
        assert_eq!(*f.recorder.notes.lock().unwrap(), vec!["Break Time!"]);
    }

    #[test]
    fn progress_tick_saves_after_completion() {
        let mut f = fixture(vec![("focusMinutes", json!(1))]);
        f.app.start_focus();
        f.clock.advance_secs(60);
        f.app.tick();
        f.app.progress_tick();

        let saved = f.progress.get("2024-03-15").unwrap().unwrap();
        assert_eq!(saved["sessionsCompleted"], json!(1));
        assert_eq!(saved["focusMinutes"], json!(1));
    }

    #[test]
    fn persisted_timer_resumes_with_todays_counters() {
        let mut f = fixture(vec![]);
        f.app.start_focus();
        f.clock.advance_secs(30);
        f.app.flush();
        let saved = serde_json::to_value(f.app.timer()).unwrap();

        let timer: TimerEngine = serde_json::from_value(saved).unwrap();
        let restored = FocusApp::with_timer(
            f.clock.clone(),
            Arc::new(MemoryStore::new("preferences")),
            f.progress.clone(),
            timer,
        );
        assert_eq!(restored.timer().phase(), TimerPhase::Focus);
        assert_eq!(restored.timer().elapsed_secs(), 30);
        assert!(restored.timer().is_running());
    }
}
