use clap::Subcommand;
use focalite_core::{Result, ValidationError};
use serde_json::Value;

use crate::context::Context;

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Get a preference (e.g. "focusMinutes", "auto_loop")
    Get {
        key: String,
    },
    /// Set a preference. Minutes are clamped to 1 second .. 24 hours.
    Set {
        key: String,
        value: String,
    },
    /// List all preferences as JSON
    List,
    /// Restore default preferences
    Reset,
}

pub fn run(action: PrefsAction) -> Result<()> {
    let ctx = Context::load()?;
    let mut prefs = ctx.preferences();

    match action {
        PrefsAction::Get { key } => {
            let value = prefs
                .get_by_key(&key)
                .ok_or(ValidationError::UnknownKey(key))?;
            println!("{}", display_value(&value));
        }
        PrefsAction::Set { key, value } => {
            prefs.set_by_key(&key, &value)?;
            if let Some(stored) = prefs.get_by_key(&key) {
                println!("{}", display_value(&stored));
            }
        }
        PrefsAction::List => {
            println!("{}", serde_json::to_string_pretty(prefs.get())?);
        }
        PrefsAction::Reset => {
            prefs.reset();
            println!("preferences reset to defaults");
        }
    }
    Ok(())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
