//! User preferences.
//!
//! Loaded once from the `preferences` store in a single batch read, then
//! edited through setters that update memory first and persist second. A
//! storage fault never undoes a setter: the new value stays in effect for
//! the rest of the process and the failure is logged.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::storage::{MemoryStore, SharedStore};
use crate::store_utils::{clamp_minutes, with_error_handling};
use crate::timer::TimerPhase;

pub const STORE_NAME: &str = "preferences";

const FOCUS_MINUTES: &str = "focusMinutes";
const BREAK_MINUTES: &str = "breakMinutes";
const AUTO_LOOP: &str = "autoLoop";
const SOUND_ENABLED: &str = "soundEnabled";
const BREAK_START_SOUND: &str = "breakStartSound";
const BREAK_END_SOUND: &str = "breakEndSound";
const ACCENT_COLOR: &str = "accentColor";

/// Every persisted preference key, in display order.
pub const KEYS: [&str; 7] = [
    FOCUS_MINUTES,
    BREAK_MINUTES,
    AUTO_LOOP,
    SOUND_ENABLED,
    BREAK_START_SOUND,
    BREAK_END_SOUND,
    ACCENT_COLOR,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub focus_minutes: f64,
    pub break_minutes: f64,
    pub auto_loop: bool,
    pub sound_enabled: bool,
    pub break_start_sound: bool,
    pub break_end_sound: bool,
    pub accent_color: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            focus_minutes: 30.0,
            break_minutes: 3.0,
            auto_loop: false,
            sound_enabled: true,
            break_start_sound: true,
            break_end_sound: true,
            accent_color: "#3b82f6".into(),
        }
    }
}

impl Preferences {
    /// Configured length of a phase in whole seconds, at least one.
    /// Idle has no duration.
    pub fn phase_duration_secs(&self, phase: TimerPhase) -> u64 {
        let minutes = match phase {
            TimerPhase::Focus => self.focus_minutes,
            TimerPhase::Break => self.break_minutes,
            TimerPhase::Idle => return 0,
        };
        (minutes * 60.0).round().max(1.0) as u64
    }

    /// Rebuild preferences from persisted entries, falling back to the
    /// default for each field that is missing or malformed.
    pub fn from_entries(entries: &HashMap<String, Value>) -> Self {
        let defaults = Self::default();
        let minutes = |key: &str, default: f64| match entries.get(key).and_then(Value::as_f64) {
            Some(n) if n.is_finite() && n > 0.0 => clamp_minutes(n),
            _ => default,
        };
        let flag = |key: &str, default: bool| {
            entries
                .get(key)
                .and_then(Value::as_bool)
                .unwrap_or(default)
        };
        let accent_color = entries
            .get(ACCENT_COLOR)
            .and_then(Value::as_str)
            .and_then(normalize_hex_color)
            .unwrap_or_else(|| defaults.accent_color.clone());

        Self {
            focus_minutes: minutes(FOCUS_MINUTES, defaults.focus_minutes),
            break_minutes: minutes(BREAK_MINUTES, defaults.break_minutes),
            auto_loop: flag(AUTO_LOOP, defaults.auto_loop),
            sound_enabled: flag(SOUND_ENABLED, defaults.sound_enabled),
            break_start_sound: flag(BREAK_START_SOUND, defaults.break_start_sound),
            break_end_sound: flag(BREAK_END_SOUND, defaults.break_end_sound),
            accent_color,
        }
    }

    fn value_of(&self, key: &str) -> Option<Value> {
        Some(match key {
            FOCUS_MINUTES => Value::from(self.focus_minutes),
            BREAK_MINUTES => Value::from(self.break_minutes),
            AUTO_LOOP => Value::Bool(self.auto_loop),
            SOUND_ENABLED => Value::Bool(self.sound_enabled),
            BREAK_START_SOUND => Value::Bool(self.break_start_sound),
            BREAK_END_SOUND => Value::Bool(self.break_end_sound),
            ACCENT_COLOR => Value::String(self.accent_color.clone()),
            _ => return None,
        })
    }
}

/// Preferences plus their backing store.
pub struct PreferencesStore {
    store: SharedStore,
    prefs: Preferences,
    loaded: bool,
}

impl std::fmt::Debug for PreferencesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferencesStore")
            .field("store", &self.store.name())
            .field("prefs", &self.prefs)
            .field("loaded", &self.loaded)
            .finish()
    }
}

impl PreferencesStore {
    /// Read every entry in one batch. A failed read leaves the defaults in
    /// place; either way the store counts as loaded afterwards.
    pub fn load(store: SharedStore) -> Self {
        let entries: HashMap<String, Value> = with_error_handling(
            || store.entries().map(|e| e.into_iter().collect()),
            "Failed to load preferences",
            HashMap::new(),
        );
        let prefs = Preferences::from_entries(&entries);
        tracing::debug!(?prefs, "preferences loaded");
        Self {
            store,
            prefs,
            loaded: true,
        }
    }

    /// Defaults backed by a throwaway in-memory store.
    pub fn in_memory() -> Self {
        Self::load(Arc::new(MemoryStore::new(STORE_NAME)))
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn get(&self) -> &Preferences {
        &self.prefs
    }

    pub fn snapshot(&self) -> Preferences {
        self.prefs.clone()
    }

    pub fn focus_minutes(&self) -> f64 {
        self.prefs.focus_minutes
    }

    pub fn break_minutes(&self) -> f64 {
        self.prefs.break_minutes
    }

    pub fn auto_loop(&self) -> bool {
        self.prefs.auto_loop
    }

    /// Returns `false` (and changes nothing) for NaN.
    pub fn set_focus_minutes(&mut self, minutes: f64) -> bool {
        if minutes.is_nan() {
            tracing::warn!("ignoring NaN focus duration");
            return false;
        }
        self.prefs.focus_minutes = clamp_minutes(minutes);
        self.persist(FOCUS_MINUTES);
        true
    }

    /// Returns `false` (and changes nothing) for NaN.
    pub fn set_break_minutes(&mut self, minutes: f64) -> bool {
        if minutes.is_nan() {
            tracing::warn!("ignoring NaN break duration");
            return false;
        }
        self.prefs.break_minutes = clamp_minutes(minutes);
        self.persist(BREAK_MINUTES);
        true
    }

    pub fn set_auto_loop(&mut self, enabled: bool) {
        self.prefs.auto_loop = enabled;
        self.persist(AUTO_LOOP);
    }

    pub fn toggle_auto_loop(&mut self) -> bool {
        self.set_auto_loop(!self.prefs.auto_loop);
        self.prefs.auto_loop
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.prefs.sound_enabled = enabled;
        self.persist(SOUND_ENABLED);
    }

    pub fn set_break_start_sound(&mut self, enabled: bool) {
        self.prefs.break_start_sound = enabled;
        self.persist(BREAK_START_SOUND);
    }

    pub fn set_break_end_sound(&mut self, enabled: bool) {
        self.prefs.break_end_sound = enabled;
        self.persist(BREAK_END_SOUND);
    }

    /// # Errors
    /// Rejects anything that is not a `#rgb` or `#rrggbb` hex colour.
    pub fn set_accent_color(&mut self, color: &str) -> Result<(), ValidationError> {
        let normalized = normalize_hex_color(color).ok_or_else(|| ValidationError::InvalidValue {
            field: ACCENT_COLOR.into(),
            message: format!("'{color}' is not a hex colour like #3b82f6"),
        })?;
        self.prefs.accent_color = normalized;
        self.persist(ACCENT_COLOR);
        Ok(())
    }

    /// Set a preference from its textual form. Keys may be camelCase or
    /// snake_case.
    ///
    /// # Errors
    /// Unknown keys and unparseable values are rejected.
    pub fn set_by_key(&mut self, key: &str, raw: &str) -> Result<(), ValidationError> {
        let key = canonical_key(key).ok_or_else(|| ValidationError::UnknownKey(key.into()))?;
        let invalid = |message: String| ValidationError::InvalidValue {
            field: key.into(),
            message,
        };

        match key {
            FOCUS_MINUTES | BREAK_MINUTES => {
                let minutes: f64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("cannot parse '{raw}' as minutes")))?;
                if minutes.is_nan() {
                    return Err(invalid("minutes must be a number".into()));
                }
                if key == FOCUS_MINUTES {
                    self.set_focus_minutes(minutes);
                } else {
                    self.set_break_minutes(minutes);
                }
            }
            ACCENT_COLOR => self.set_accent_color(raw)?,
            _ => {
                let flag = parse_flag(raw)
                    .ok_or_else(|| invalid(format!("cannot parse '{raw}' as a boolean")))?;
                match key {
                    AUTO_LOOP => self.set_auto_loop(flag),
                    SOUND_ENABLED => self.set_sound_enabled(flag),
                    BREAK_START_SOUND => self.set_break_start_sound(flag),
                    _ => self.set_break_end_sound(flag),
                }
            }
        }
        Ok(())
    }

    /// Current value of a preference by key.
    pub fn get_by_key(&self, key: &str) -> Option<Value> {
        canonical_key(key).and_then(|k| self.prefs.value_of(k))
    }

    /// Restore defaults and persist every field.
    pub fn reset(&mut self) {
        self.prefs = Preferences::default();
        for key in KEYS {
            self.persist(key);
        }
    }

    fn persist(&self, key: &str) {
        let Some(value) = self.prefs.value_of(key) else {
            return;
        };
        tracing::debug!(key, %value, "saving preference");
        with_error_handling(
            || {
                self.store.set(key, value)?;
                self.store.save()
            },
            &format!("Failed to save preference '{key}'"),
            (),
        );
    }
}

fn canonical_key(key: &str) -> Option<&'static str> {
    let folded: String = key
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect::<String>()
        .to_ascii_lowercase();
    KEYS.into_iter().find(|k| k.to_ascii_lowercase() == folded)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn normalize_hex_color(color: &str) -> Option<String> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some(format!("#{}", hex.to_ascii_lowercase())),
        3 => Some(
            hex.chars()
                .flat_map(|c| [c, c])
                .fold(String::from("#"), |mut s, c| {
                    s.push(c.to_ascii_lowercase());
                    s
                }),
        ),
        _ => None,
    }
}
