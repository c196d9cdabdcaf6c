pub mod config;
pub mod prefs;
pub mod stats;
pub mod timer;
