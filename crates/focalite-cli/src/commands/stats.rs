use clap::Subcommand;
use focalite_core::progress::MAX_HISTORY_DAYS;
use focalite_core::{Result, WindowOptions};

use crate::context::Context;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's progress
    Today,
    /// Stored daily records, oldest first
    History {
        /// Number of days including today (defaults to stats.history_days)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_HISTORY_DAYS)))]
        days: Option<u32>,
        /// Include days without a record as zeroed entries
        #[arg(long)]
        fill: bool,
    },
    /// Totals over a window of days
    Summary {
        /// Number of days including today (defaults to stats.history_days)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_HISTORY_DAYS)))]
        days: Option<u32>,
    },
}

pub fn run(action: StatsAction) -> Result<()> {
    let ctx = Context::load()?;
    let app = ctx.app();
    let default_days = ctx.config.stats.history_days;

    match action {
        StatsAction::Today => {
            println!("{}", serde_json::to_string_pretty(&app.current_progress())?);
        }
        StatsAction::History { days, fill } => {
            let days = days.unwrap_or(default_days);
            let records = if fill {
                app.daily_window(days, WindowOptions::default())
            } else {
                app.history(days)
            };
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        StatsAction::Summary { days } => {
            let summary = app.summary(days.unwrap_or(default_days));
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
