//! Daily progress.
//!
//! One record per calendar date in the `progress` store, keyed
//! `YYYY-MM-DD`. Today's record is never edited directly: it is a snapshot
//! of the timer's counters, written on completions, on a throttled schedule
//! while a phase runs, and at midnight rollover.

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::{to_datetime, SharedClock};
use crate::events::Event;
use crate::storage::SharedStore;
use crate::store_utils::{local_date_string, parse_date, validate_count, with_error_handling, Throttle};
use crate::timer::{DayCounters, TimerEngine};

pub const STORE_NAME: &str = "progress";

/// Throttled autosave window while a phase is running.
pub const AUTOSAVE_INTERVAL_MS: i64 = 15_000;

/// Rollover and autosave check period.
pub const PROGRESS_TICK_MS: u64 = 1000;

/// Longest history or summary window, about ten years.
pub const MAX_HISTORY_DAYS: u32 = 3650;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgress {
    pub date: String,
    pub sessions_completed: u64,
    pub breaks_completed: u64,
    pub focus_minutes: u64,
    pub break_minutes: u64,
}

impl DailyProgress {
    pub fn empty(date: NaiveDate) -> Self {
        Self::from_counters(date, DayCounters::default())
    }

    pub fn from_counters(date: NaiveDate, counters: DayCounters) -> Self {
        Self {
            date: local_date_string(date),
            sessions_completed: counters.sessions_completed,
            breaks_completed: counters.breaks_completed,
            focus_minutes: counters.focus_minutes,
            break_minutes: counters.break_minutes,
        }
    }

    /// Read a stored record, validating every field on its own. The stored
    /// date wins when it parses; otherwise the key's date is used.
    pub fn from_value(value: &Value, key_date: NaiveDate) -> Self {
        let field = |name: &str| validate_count(value.get(name)) as u64;
        let date = value
            .get("date")
            .and_then(Value::as_str)
            .filter(|s| parse_date(s).is_some())
            .map(str::to_string)
            .unwrap_or_else(|| local_date_string(key_date));
        Self {
            date,
            sessions_completed: field("sessionsCompleted"),
            breaks_completed: field("breaksCompleted"),
            focus_minutes: field("focusMinutes"),
            break_minutes: field("breakMinutes"),
        }
    }

    pub fn counters(&self) -> DayCounters {
        DayCounters {
            sessions_completed: self.sessions_completed,
            breaks_completed: self.breaks_completed,
            focus_minutes: self.focus_minutes,
            break_minutes: self.break_minutes,
        }
    }

    pub fn is_active(&self) -> bool {
        self.sessions_completed > 0 || self.breaks_completed > 0
    }
}

/// Options for [`ProgressStore::daily_window`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOptions {
    /// Use the timer's live counters for today instead of the stored record.
    pub include_today: bool,
    /// Emit zeroed entries for days without a record.
    pub fill_missing: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            include_today: true,
            fill_missing: true,
        }
    }
}

/// Totals across a window of days.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub days: u32,
    pub active_days: u32,
    pub sessions_completed: u64,
    pub breaks_completed: u64,
    pub focus_minutes: u64,
    pub break_minutes: u64,
}

pub struct ProgressStore {
    store: SharedStore,
    clock: SharedClock,
    current_date: NaiveDate,
    loaded: bool,
    last_persisted_completion_at: Option<i64>,
    save_throttle: Throttle,
    autosave_ms: i64,
}

impl ProgressStore {
    /// Not loaded yet: call [`ProgressStore::load_today`] before ticking.
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        let current_date = clock.today();
        Self {
            store,
            clock,
            current_date,
            loaded: false,
            last_persisted_completion_at: None,
            save_throttle: Throttle::new(),
            autosave_ms: AUTOSAVE_INTERVAL_MS,
        }
    }

    pub fn set_autosave_interval(&mut self, ms: i64) {
        self.autosave_ms = ms;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn is_save_pending(&self) -> bool {
        self.save_throttle.is_pending()
    }

    /// Restore today's counters into the timer, or zero them when today has
    /// no record. A read failure counts as "no record".
    pub fn load_today(&mut self, timer: &mut TimerEngine) {
        let today = self.clock.today();
        let key = local_date_string(today);
        let record = with_error_handling(
            || self.store.get(&key),
            "Failed to load today's progress",
            None,
        );

        match record {
            Some(value) => {
                let progress = DailyProgress::from_value(&value, today);
                tracing::debug!(?progress, "restored today's progress");
                timer.set_day_counters(progress.counters());
            }
            None => timer.set_day_counters(DayCounters::default()),
        }

        self.current_date = today;
        self.loaded = true;
        self.last_persisted_completion_at = timer.last_completion_at_ms();
    }

    /// Today's record as derived from the timer.
    pub fn current_progress(&self, timer: &TimerEngine) -> DailyProgress {
        DailyProgress::from_counters(self.current_date, timer.day_counters())
    }

    /// Periodic check: midnight rollover, throttled autosave while running,
    /// immediate save after a completion.
    pub fn on_tick(&mut self, timer: &mut TimerEngine) -> Option<Event> {
        if !self.loaded {
            return None;
        }

        let today = self.clock.today();
        if today != self.current_date {
            return Some(self.handle_new_day(today, timer));
        }

        let now = self.clock.now_ms();
        if timer.is_running() {
            self.save_throttle.schedule(now, self.autosave_ms);
        }
        if self.save_throttle.poll(now) {
            self.save(timer);
        }
        if timer.last_completion_at_ms() != self.last_persisted_completion_at {
            self.save(timer);
        }
        None
    }

    fn handle_new_day(&mut self, new_date: NaiveDate, timer: &mut TimerEngine) -> Event {
        let from = self.current_date;
        tracing::info!(%from, to = %new_date, "day rolled over");
        self.save(timer);

        self.current_date = new_date;
        timer.set_day_counters(DayCounters::default());
        self.save_throttle.clear();
        self.save(timer);

        Event::DayRolledOver {
            from,
            to: new_date,
            at: to_datetime(self.clock.now_ms()),
        }
    }

    /// Write today's record. Returns `false` if the write failed (logged).
    pub fn save(&mut self, timer: &TimerEngine) -> bool {
        let progress = self.current_progress(timer);
        let saved = with_error_handling(
            || {
                let value = serde_json::to_value(&progress)?;
                self.store.set(&progress.date, value)?;
                self.store.save()?;
                Ok::<_, crate::error::StorageError>(true)
            },
            "Failed to save progress",
            false,
        );
        if saved {
            self.last_persisted_completion_at = timer.last_completion_at_ms();
        }
        saved
    }

    /// Stored records for the last `days` days (today included), oldest
    /// first. Days without a record are omitted. Any read failure yields an
    /// empty history. `days` is capped at [`MAX_HISTORY_DAYS`].
    pub fn history(&self, days: u32) -> Vec<DailyProgress> {
        let days = days.min(MAX_HISTORY_DAYS);
        let today = self.clock.today();
        with_error_handling(
            || {
                let mut results = Vec::new();
                for i in 0..days {
                    let Some(date) = today.checked_sub_days(Days::new(u64::from(i))) else {
                        break;
                    };
                    if let Some(value) = self.store.get(&local_date_string(date))? {
                        results.push(DailyProgress::from_value(&value, date));
                    }
                }
                results.reverse();
                Ok::<_, crate::error::StorageError>(results)
            },
            "Failed to get historical progress",
            Vec::new(),
        )
    }

    /// One entry per day for the last `days` days, oldest first, capped at
    /// [`MAX_HISTORY_DAYS`].
    pub fn daily_window(
        &self,
        timer: &TimerEngine,
        days: u32,
        options: WindowOptions,
    ) -> Vec<DailyProgress> {
        let days = days.min(MAX_HISTORY_DAYS);
        if days == 0 {
            return Vec::new();
        }
        let by_date: HashMap<String, DailyProgress> = self
            .history(days)
            .into_iter()
            .map(|entry| (entry.date.clone(), entry))
            .collect();

        let today = self.clock.today();
        let Some(start) = today.checked_sub_days(Days::new(u64::from(days - 1))) else {
            return Vec::new();
        };

        let mut window = Vec::with_capacity(days as usize);
        for date in start.iter_days().take(days as usize) {
            let key = local_date_string(date);
            if options.include_today && date == self.current_date {
                window.push(self.current_progress(timer));
            } else if let Some(persisted) = by_date.get(&key) {
                window.push(persisted.clone());
            } else if options.fill_missing {
                window.push(DailyProgress::empty(date));
            }
        }
        window
    }

    /// Totals over the last `days` days, today taken live from the timer.
    pub fn summary(&self, timer: &TimerEngine, days: u32) -> ProgressSummary {
        let options = WindowOptions {
            include_today: true,
            fill_missing: false,
        };
        self.daily_window(timer, days, options).iter().fold(
            ProgressSummary {
                days: days.min(MAX_HISTORY_DAYS),
                ..ProgressSummary::default()
            },
            |mut acc, day| {
                acc.active_days += u32::from(day.is_active());
                acc.sessions_completed += day.sessions_completed;
                acc.breaks_completed += day.breaks_completed;
                acc.focus_minutes += day.focus_minutes;
                acc.break_minutes += day.break_minutes;
                acc
            },
        )
    }
}
