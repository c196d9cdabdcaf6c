//! Shared helpers for the timer, preferences and progress stores.

use std::fmt::Display;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shortest configurable phase: one second.
pub const MIN_MINUTES: f64 = 1.0 / 60.0;
/// Longest configurable phase: one day.
pub const MAX_MINUTES: f64 = 1440.0;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Tracks whether a periodic callback is armed and at what period.
///
/// The owner is driven from outside (a UI loop or the CLI runtime); this
/// only records the lifecycle so that `tick()` can ignore calls while the
/// interval is stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalManager {
    period_ms: Option<u64>,
}

impl IntervalManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the interval, replacing any previous one.
    pub fn start(&mut self, period_ms: u64) {
        self.stop();
        self.period_ms = Some(period_ms);
    }

    pub fn stop(&mut self) {
        self.period_ms = None;
    }

    pub fn is_running(&self) -> bool {
        self.period_ms.is_some()
    }

    pub fn period_ms(&self) -> Option<u64> {
        self.period_ms
    }
}

/// "Ignore calls while pending" throttle.
///
/// At most one deadline exists at a time; later `schedule` calls are dropped
/// until the pending one fires via [`Throttle::poll`] or is cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Throttle {
    due_at_ms: Option<i64>,
}

impl Throttle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this call armed a new deadline.
    pub fn schedule(&mut self, now_ms: i64, delay_ms: i64) -> bool {
        if self.due_at_ms.is_some() {
            return false;
        }
        self.due_at_ms = Some(now_ms.saturating_add(delay_ms));
        true
    }

    /// Returns `true` exactly once when the pending deadline has passed.
    pub fn poll(&mut self, now_ms: i64) -> bool {
        match self.due_at_ms {
            Some(due) if now_ms >= due => {
                self.due_at_ms = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.due_at_ms = None;
    }

    pub fn is_pending(&self) -> bool {
        self.due_at_ms.is_some()
    }
}

/// Accept `value` only if it is a finite JSON number within `[min, max]`.
pub fn validate_number(value: Option<&Value>, default: f64, min: f64, max: f64) -> f64 {
    match value.and_then(Value::as_f64) {
        Some(n) if n.is_finite() && n >= min && n <= max => n,
        _ => default,
    }
}

/// Non-negative counter read back from storage.
pub fn validate_count(value: Option<&Value>) -> f64 {
    validate_number(value, 0.0, 0.0, f64::INFINITY)
}

/// Clamp a minute value into `[MIN_MINUTES, MAX_MINUTES]`.
///
/// NaN maps to the lower bound; callers that must reject NaN check first.
pub fn clamp_minutes(input: f64) -> f64 {
    if input.is_nan() {
        return MIN_MINUTES;
    }
    input.clamp(MIN_MINUTES, MAX_MINUTES)
}

/// Run a fallible operation, logging the failure and returning `default`.
pub fn with_error_handling<T, E, F>(operation: F, error_message: &str, default: T) -> T
where
    E: Display,
    F: FnOnce() -> Result<T, E>,
{
    match operation() {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(error = %err, "{error_message}");
            default
        }
    }
}

/// `YYYY-MM-DD` key for a calendar date.
pub fn local_date_string(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// Format seconds as `MM:SS`. Negative input shows as `00:00`.
pub fn format_time(secs: i64) -> String {
    let total = secs.max(0);
    format!("{:02}:{:02}", total / 60, total % 60)
}
