mod engine;

pub use engine::{DayCounters, TimerEngine, TimerPhase, TICK_INTERVAL_MS};
