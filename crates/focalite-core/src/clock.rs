//! Wall-clock abstraction.
//!
//! The timer and the progress store never read the system time directly;
//! they ask a [`Clock`]. Production code uses [`SystemClock`], tests drive a
//! [`ManualClock`] forward by hand.

use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

/// Source of "now" for every time-dependent rule.
pub trait Clock: Debug + Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;

    /// The calendar date used for daily progress keys.
    fn today(&self) -> NaiveDate;
}

/// Shared handle to a clock.
pub type SharedClock = Arc<dyn Clock>;

/// Real wall clock; dates are local calendar dates.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Hand-driven clock for tests. Dates are computed in UTC so results do not
/// depend on the machine's time zone.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    /// Start at midnight UTC of the given date plus `hour` hours.
    pub fn at(date: NaiveDate, hour: u32) -> Self {
        let start = date
            .and_hms_opt(hour, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive).timestamp_millis())
            .unwrap_or_default();
        Self::new(start)
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_ms(secs * 1000);
    }

    pub fn set_ms(&self, ms: i64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn today(&self) -> NaiveDate {
        DateTime::<Utc>::from_timestamp_millis(self.now_ms())
            .map(|dt| dt.date_naive())
            .unwrap_or_default()
    }
}

/// Convert epoch milliseconds into a UTC timestamp for events.
pub fn to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_across_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let clock = ManualClock::at(date, 23);
        assert_eq!(clock.today(), date);

        clock.advance_secs(3600);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 16).unwrap());
    }
}
