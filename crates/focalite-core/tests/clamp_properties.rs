//! Property tests for minute clamping and preference persistence.

use std::sync::Arc;

use focalite_core::storage::MemoryStore;
use focalite_core::store_utils::{clamp_minutes, format_time, MAX_MINUTES, MIN_MINUTES};
use focalite_core::{KvStore, PreferencesStore, TimerPhase};
use proptest::prelude::*;

proptest! {
    #[test]
    fn clamp_stays_in_bounds(input in proptest::num::f64::ANY) {
        let clamped = clamp_minutes(input);
        prop_assert!(clamped >= MIN_MINUTES);
        prop_assert!(clamped <= MAX_MINUTES);
    }

    #[test]
    fn clamp_is_idempotent(input in proptest::num::f64::ANY) {
        let once = clamp_minutes(input);
        prop_assert_eq!(clamp_minutes(once), once);
    }

    #[test]
    fn in_range_values_pass_through(input in MIN_MINUTES..=MAX_MINUTES) {
        prop_assert_eq!(clamp_minutes(input), input);
    }

    #[test]
    fn focus_setter_round_trips_through_storage(minutes in -10_000.0f64..10_000.0) {
        let store = Arc::new(MemoryStore::new("preferences"));
        let mut prefs = PreferencesStore::load(store.clone());
        prop_assert!(prefs.set_focus_minutes(minutes));
        let stored = store.get("focusMinutes").unwrap().and_then(|v| v.as_f64());
        prop_assert_eq!(stored, Some(prefs.focus_minutes()));

        let reloaded = PreferencesStore::load(store);
        prop_assert_eq!(reloaded.focus_minutes(), prefs.focus_minutes());
        prop_assert!(reloaded.get().phase_duration_secs(TimerPhase::Focus) >= 1);
    }

    #[test]
    fn formatted_time_has_two_digit_seconds(secs in 0i64..200_000) {
        let label = format_time(secs);
        let (minutes, seconds) = label.split_once(':').unwrap();
        prop_assert_eq!(seconds.len(), 2);
        prop_assert_eq!(minutes.parse::<i64>().unwrap() * 60 + seconds.parse::<i64>().unwrap(), secs);
    }
}
