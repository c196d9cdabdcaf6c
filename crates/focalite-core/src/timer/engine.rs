//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()` every
//! [`TICK_INTERVAL_MS`] while [`TimerEngine::is_ticking`] is true.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Focus -> Break -> Idle
//!           ^        |
//!           +--------+   (auto-loop, natural completion only)
//! ```
//!
//! Focus and Break can each be paused; `reset()` returns to Idle from
//! anywhere.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(Arc::new(SystemClock));
//! engine.start_focus(prefs.get());
//! // Every 250ms:
//! for event in engine.tick(prefs.get()) { /* notify, save */ }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::{to_datetime, SharedClock, SystemClock};
use crate::events::Event;
use crate::preferences::Preferences;
use crate::store_utils::{format_time, IntervalManager};

/// Countdown tick period while a phase is running.
pub const TICK_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    #[default]
    Idle,
    Focus,
    Break,
}

/// Today's completion counters, shared with the progress store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCounters {
    pub sessions_completed: u64,
    pub breaks_completed: u64,
    pub focus_minutes: u64,
    pub break_minutes: u64,
}

/// Core timer engine.
///
/// Operates on wall-clock deltas -- no internal thread.
/// Serializable so a one-shot front end can persist it between runs; the
/// clock is not serialized and must be re-attached with [`set_clock`].
///
/// [`set_clock`]: TimerEngine::set_clock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    phase: TimerPhase,
    /// Epoch ms when the current run segment began; `None` while paused/idle.
    started_at_ms: Option<i64>,
    /// Seconds accumulated by earlier run segments of this phase.
    base_elapsed_secs: u64,
    /// Phase length frozen at phase start.
    locked_duration_secs: Option<u64>,

    sessions_completed: u64,
    breaks_completed: u64,
    total_focus_minutes: u64,
    total_break_minutes: u64,
    last_completed_phase: Option<TimerPhase>,
    last_completion_at_ms: Option<i64>,
    is_manual_cycle: bool,

    #[serde(default)]
    ticker: IntervalManager,
    #[serde(skip, default = "default_clock")]
    clock: SharedClock,
}

fn default_clock() -> SharedClock {
    Arc::new(SystemClock)
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(default_clock())
    }
}

impl TimerEngine {
    /// Create an idle engine with zeroed counters.
    pub fn new(clock: SharedClock) -> Self {
        Self {
            phase: TimerPhase::Idle,
            started_at_ms: None,
            base_elapsed_secs: 0,
            locked_duration_secs: None,
            sessions_completed: 0,
            breaks_completed: 0,
            total_focus_minutes: 0,
            total_break_minutes: 0,
            last_completed_phase: None,
            last_completion_at_ms: None,
            is_manual_cycle: false,
            ticker: IntervalManager::new(),
            clock,
        }
    }

    pub fn set_clock(&mut self, clock: SharedClock) {
        self.clock = clock;
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn started_at_ms(&self) -> Option<i64> {
        self.started_at_ms
    }

    pub fn base_elapsed_secs(&self) -> u64 {
        self.base_elapsed_secs
    }

    pub fn is_manual_cycle(&self) -> bool {
        self.is_manual_cycle
    }

    pub fn last_completed_phase(&self) -> Option<TimerPhase> {
        self.last_completed_phase
    }

    pub fn last_completion_at_ms(&self) -> Option<i64> {
        self.last_completion_at_ms
    }

    pub fn sessions_completed(&self) -> u64 {
        self.sessions_completed
    }

    pub fn breaks_completed(&self) -> u64 {
        self.breaks_completed
    }

    pub fn total_focus_minutes(&self) -> u64 {
        self.total_focus_minutes
    }

    pub fn total_break_minutes(&self) -> u64 {
        self.total_break_minutes
    }

    pub fn day_counters(&self) -> DayCounters {
        DayCounters {
            sessions_completed: self.sessions_completed,
            breaks_completed: self.breaks_completed,
            focus_minutes: self.total_focus_minutes,
            break_minutes: self.total_break_minutes,
        }
    }

    /// Overwrite today's counters (restore from storage or day rollover).
    pub fn set_day_counters(&mut self, counters: DayCounters) {
        self.sessions_completed = counters.sessions_completed;
        self.breaks_completed = counters.breaks_completed;
        self.total_focus_minutes = counters.focus_minutes;
        self.total_break_minutes = counters.break_minutes;
    }

    /// Whether the countdown interval is armed.
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_running()
    }

    /// Length of the current phase. Every phase start locks a duration, so
    /// this is 0 only while idle.
    pub fn current_duration_secs(&self) -> u64 {
        self.locked_duration_secs.unwrap_or(0)
    }

    pub fn elapsed_secs(&self) -> u64 {
        let running = self
            .started_at_ms
            .map(|started| (self.clock.now_ms().saturating_sub(started).max(0) / 1000) as u64)
            .unwrap_or(0);
        running + self.base_elapsed_secs
    }

    pub fn remaining_secs(&self) -> u64 {
        self.current_duration_secs()
            .saturating_sub(self.elapsed_secs())
    }

    pub fn is_running(&self) -> bool {
        self.started_at_ms.is_some() && self.remaining_secs() > 0
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn progress(&self) -> f64 {
        let total = self.current_duration_secs();
        if self.phase == TimerPhase::Idle || total == 0 {
            return 0.0;
        }
        (total - self.remaining_secs()) as f64 / total as f64
    }

    /// Main countdown label. While idle this follows the live focus
    /// preference rather than any locked value.
    pub fn time_label(&self, prefs: &Preferences) -> String {
        let secs = match self.phase {
            TimerPhase::Idle => prefs.phase_duration_secs(TimerPhase::Focus),
            _ => self.remaining_secs(),
        };
        format_time(secs as i64)
    }

    pub fn focus_duration_label(&self, prefs: &Preferences) -> String {
        format_time(prefs.phase_duration_secs(TimerPhase::Focus) as i64)
    }

    /// Locked length during a break, otherwise the live preference.
    pub fn break_duration_label(&self, prefs: &Preferences) -> String {
        let secs = match (self.phase, self.locked_duration_secs) {
            (TimerPhase::Break, Some(locked)) => locked,
            _ => prefs.phase_duration_secs(TimerPhase::Break),
        };
        format_time(secs as i64)
    }

    pub fn phase_label(&self) -> &'static str {
        match (self.phase, self.is_running()) {
            (TimerPhase::Idle, _) => "Ready to focus",
            (TimerPhase::Focus, true) => "Focusing...",
            (TimerPhase::Focus, false) => "Paused",
            (TimerPhase::Break, true) => "On break",
            (TimerPhase::Break, false) => "Break paused",
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, prefs: &Preferences) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            running: self.is_running(),
            phase_label: self.phase_label().to_string(),
            time_label: self.time_label(prefs),
            duration_secs: self.current_duration_secs(),
            elapsed_secs: self.elapsed_secs(),
            remaining_secs: self.remaining_secs(),
            progress: self.progress(),
            sessions_completed: self.sessions_completed,
            breaks_completed: self.breaks_completed,
            total_focus_minutes: self.total_focus_minutes,
            total_break_minutes: self.total_break_minutes,
            is_manual_cycle: self.is_manual_cycle,
            at: to_datetime(self.clock.now_ms()),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a focus phase. A new focus phase always begins a fresh,
    /// non-manual cycle.
    pub fn start_focus(&mut self, prefs: &Preferences) -> Vec<Event> {
        self.is_manual_cycle = false;
        vec![self.begin_phase(TimerPhase::Focus, prefs)]
    }

    pub fn start_break(&mut self, prefs: &Preferences) -> Vec<Event> {
        vec![self.begin_phase(TimerPhase::Break, prefs)]
    }

    /// Break requested by the user. From focus, the partial session is
    /// credited first. The resulting cycle never auto-loops.
    pub fn start_manual_break(&mut self, prefs: &Preferences) -> Vec<Event> {
        let mut events = Vec::new();
        match self.phase {
            TimerPhase::Break => return events,
            TimerPhase::Focus => {
                self.ticker.stop();
                let minutes = self.elapsed_secs() / 60;
                self.sessions_completed += 1;
                self.total_focus_minutes += minutes;
                self.record_completion(TimerPhase::Focus);
                events.push(Event::FocusCompleted {
                    minutes,
                    partial: true,
                    at: self.now(),
                });
            }
            TimerPhase::Idle => {}
        }
        self.is_manual_cycle = true;
        events.extend(self.start_break(prefs));
        events
    }

    /// Finish a break before its countdown ends, crediting the minutes
    /// actually taken.
    pub fn end_break_early(&mut self) -> Vec<Event> {
        if self.phase != TimerPhase::Break {
            return Vec::new();
        }
        let minutes = self.elapsed_secs() / 60;
        self.breaks_completed += 1;
        self.total_break_minutes += minutes;
        self.record_completion(TimerPhase::Break);
        let mut events = vec![Event::BreakCompleted {
            minutes,
            early: true,
            at: self.now(),
        }];
        events.extend(self.reset());
        events
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.started_at_ms.is_none() {
            return None;
        }
        self.base_elapsed_secs = self.elapsed_secs();
        self.started_at_ms = None;
        self.ticker.stop();
        tracing::debug!(phase = ?self.phase, elapsed = self.base_elapsed_secs, "timer paused");
        Some(Event::TimerPaused {
            phase: self.phase,
            elapsed_secs: self.base_elapsed_secs,
            at: self.now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.started_at_ms.is_some() || self.phase == TimerPhase::Idle {
            return None;
        }
        self.started_at_ms = Some(self.clock.now_ms());
        self.ticker.start(TICK_INTERVAL_MS);
        tracing::debug!(phase = ?self.phase, "timer resumed");
        Some(Event::TimerResumed {
            phase: self.phase,
            remaining_secs: self.remaining_secs(),
            at: self.now(),
        })
    }

    /// Return to idle. Today's counters are kept.
    pub fn reset(&mut self) -> Option<Event> {
        self.phase = TimerPhase::Idle;
        self.started_at_ms = None;
        self.base_elapsed_secs = 0;
        self.locked_duration_secs = None;
        self.is_manual_cycle = false;
        self.ticker.stop();
        Some(Event::TimerReset { at: self.now() })
    }

    /// Call periodically. Performs completion bookkeeping once the countdown
    /// reaches zero and returns the resulting events.
    pub fn tick(&mut self, prefs: &Preferences) -> Vec<Event> {
        if !self.ticker.is_running() {
            return Vec::new();
        }
        if self.started_at_ms.is_some() && self.remaining_secs() == 0 {
            return self.complete(prefs);
        }
        Vec::new()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_phase(&mut self, phase: TimerPhase, prefs: &Preferences) -> Event {
        self.ticker.stop();
        let duration_secs = prefs.phase_duration_secs(phase);
        self.phase = phase;
        self.locked_duration_secs = Some(duration_secs);
        self.base_elapsed_secs = 0;
        self.started_at_ms = Some(self.clock.now_ms());
        self.ticker.start(TICK_INTERVAL_MS);
        tracing::debug!(?phase, duration_secs, manual = self.is_manual_cycle, "phase started");

        let at = self.now();
        match phase {
            TimerPhase::Break => Event::BreakStarted {
                duration_secs,
                manual: self.is_manual_cycle,
                at,
            },
            _ => Event::FocusStarted { duration_secs, at },
        }
    }

    fn complete(&mut self, prefs: &Preferences) -> Vec<Event> {
        self.ticker.stop();
        let completed = self.phase;
        let minutes = self.current_duration_secs() / 60;
        self.record_completion(completed);
        tracing::debug!(phase = ?completed, minutes, "phase completed");

        let mut events = Vec::new();
        match completed {
            TimerPhase::Focus => {
                self.sessions_completed += 1;
                self.total_focus_minutes += minutes;
                events.push(Event::FocusCompleted {
                    minutes,
                    partial: false,
                    at: self.now(),
                });
                events.extend(self.start_break(prefs));
            }
            TimerPhase::Break => {
                self.breaks_completed += 1;
                self.total_break_minutes += minutes;
                events.push(Event::BreakCompleted {
                    minutes,
                    early: false,
                    at: self.now(),
                });
                if prefs.auto_loop && !self.is_manual_cycle {
                    events.extend(self.start_focus(prefs));
                } else {
                    events.extend(self.reset());
                }
            }
            TimerPhase::Idle => {}
        }
        events
    }

    fn record_completion(&mut self, phase: TimerPhase) {
        self.last_completed_phase = Some(phase);
        self.last_completion_at_ms = Some(self.clock.now_ms());
    }

    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        to_datetime(self.clock.now_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn engine() -> (Arc<ManualClock>, TimerEngine) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let engine = TimerEngine::new(clock.clone());
        (clock, engine)
    }

    #[test]
    fn starts_idle() {
        let (_, engine) = engine();
        assert_eq!(engine.phase(), TimerPhase::Idle);
        assert!(engine.started_at_ms().is_none());
        assert!(!engine.is_running());
        assert!(!engine.is_ticking());
        assert_eq!(engine.sessions_completed(), 0);
        assert_eq!(engine.progress(), 0.0);
    }

    #[test]
    fn remaining_counts_down_from_locked_duration() {
        let (clock, mut engine) = engine();
        let prefs = Preferences::default();
        engine.start_focus(&prefs);
        assert_eq!(engine.remaining_secs(), 1800);
        assert!(engine.is_running());

        clock.advance_secs(10);
        assert_eq!(engine.remaining_secs(), 1790);
        assert_eq!(engine.elapsed_secs(), 10);
    }

    #[test]
    fn sub_second_time_is_floored() {
        let (clock, mut engine) = engine();
        engine.start_focus(&Preferences::default());
        clock.advance_ms(999);
        assert_eq!(engine.elapsed_secs(), 0);
        clock.advance_ms(1);
        assert_eq!(engine.elapsed_secs(), 1);
    }

    #[test]
    fn pause_freezes_elapsed_and_resume_continues() {
        let (clock, mut engine) = engine();
        engine.start_focus(&Preferences::default());
        clock.advance_secs(5);
        let before = engine.elapsed_secs();

        assert!(engine.pause().is_some());
        assert!(!engine.is_running());
        assert!(!engine.is_ticking());
        assert_eq!(engine.base_elapsed_secs(), before);
        clock.advance_secs(10);
        assert_eq!(engine.elapsed_secs(), before);
        assert_eq!(engine.phase_label(), "Paused");

        assert!(engine.resume().is_some());
        assert!(engine.is_running());
        clock.advance_secs(2);
        assert_eq!(engine.elapsed_secs(), before + 2);
    }

    #[test]
    fn pause_and_resume_are_guarded() {
        let (_, mut engine) = engine();
        assert!(engine.pause().is_none());
        assert!(engine.resume().is_none());

        engine.start_focus(&Preferences::default());
        assert!(engine.resume().is_none());
        assert!(engine.pause().is_some());
        assert!(engine.pause().is_none());
    }

    #[test]
    fn tick_before_deadline_does_nothing() {
        let (clock, mut engine) = engine();
        let prefs = Preferences::default();
        engine.start_focus(&prefs);
        clock.advance_secs(1799);
        assert!(engine.tick(&prefs).is_empty());
        assert_eq!(engine.phase(), TimerPhase::Focus);
    }

    #[test]
    fn reset_clears_phase_but_keeps_counters() {
        let (_, mut engine) = engine();
        let prefs = Preferences::default();
        engine.set_day_counters(DayCounters {
            sessions_completed: 2,
            breaks_completed: 1,
            focus_minutes: 60,
            break_minutes: 3,
        });
        engine.start_manual_break(&prefs);
        assert!(engine.is_manual_cycle());

        engine.reset();
        assert_eq!(engine.phase(), TimerPhase::Idle);
        assert_eq!(engine.current_duration_secs(), 0);
        assert!(!engine.is_manual_cycle());
        assert_eq!(engine.day_counters().sessions_completed, 2);
    }

    #[test]
    fn labels_follow_phase() {
        let (_, mut engine) = engine();
        let mut prefs = Preferences::default();
        assert_eq!(engine.phase_label(), "Ready to focus");
        assert_eq!(engine.time_label(&prefs), "30:00");

        engine.start_break(&prefs);
        assert_eq!(engine.phase_label(), "On break");
        prefs.break_minutes = 10.0;
        assert_eq!(engine.break_duration_label(&prefs), "03:00");
        engine.pause();
        assert_eq!(engine.phase_label(), "Break paused");

        engine.reset();
        assert_eq!(engine.break_duration_label(&prefs), "10:00");
    }

    #[test]
    fn engine_survives_serialization() {
        let (clock, mut engine) = engine();
        engine.start_focus(&Preferences::default());
        clock.advance_secs(30);

        let json = serde_json::to_string(&engine).unwrap();
        let mut restored: TimerEngine = serde_json::from_str(&json).unwrap();
        restored.set_clock(clock.clone());

        assert_eq!(restored.phase(), TimerPhase::Focus);
        assert!(restored.is_ticking());
        assert_eq!(restored.elapsed_secs(), 30);
        assert_eq!(restored.remaining_secs(), 1770);
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let (_, engine) = engine();
        match engine.snapshot(&Preferences::default()) {
            Event::StateSnapshot {
                phase,
                running,
                time_label,
                remaining_secs,
                ..
            } => {
                assert_eq!(phase, TimerPhase::Idle);
                assert!(!running);
                assert_eq!(time_label, "30:00");
                assert_eq!(remaining_secs, 0);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }
}
