use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerPhase;

/// Every state change in the system produces an Event.
/// The application context dispatches notifications and sounds from them;
/// the CLI prints them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    FocusStarted {
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    BreakStarted {
        duration_secs: u64,
        /// Break was requested by the user rather than reached naturally.
        manual: bool,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: TimerPhase,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        phase: TimerPhase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A focus phase was credited to today's counters.
    FocusCompleted {
        minutes: u64,
        /// Cut short by a manual break.
        partial: bool,
        at: DateTime<Utc>,
    },
    /// A break phase was credited to today's counters.
    BreakCompleted {
        minutes: u64,
        /// Ended by the user before the countdown ran out.
        early: bool,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    DayRolledOver {
        from: NaiveDate,
        to: NaiveDate,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: TimerPhase,
        running: bool,
        phase_label: String,
        time_label: String,
        duration_secs: u64,
        elapsed_secs: u64,
        remaining_secs: u64,
        progress: f64,
        sessions_completed: u64,
        breaks_completed: u64,
        total_focus_minutes: u64,
        total_break_minutes: u64,
        is_manual_cycle: bool,
        at: DateTime<Utc>,
    },
}
