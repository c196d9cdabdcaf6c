use std::time::Duration;

use clap::Subcommand;
use focalite_core::{Event, FocusApp, Result, TimerPhase};
use tokio::time::MissedTickBehavior;

use crate::context::Context;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a focus session
    Start,
    /// Start a break
    Break,
    /// Take a break now; a running focus session is credited as partial
    ManualBreak,
    /// End the current break early
    EndBreak,
    /// Pause the running phase
    Pause,
    /// Resume a paused phase
    Resume,
    /// Reset to idle (today's counters are kept)
    Reset,
    /// Print current timer state as JSON
    Status,
    /// Run the timer in the foreground until it returns to idle.
    /// Starts a focus session first if the timer is idle and resumes it if
    /// it is paused.
    Run,
}

pub fn run(action: TimerAction) -> Result<()> {
    let ctx = Context::load()?;
    let mut app = ctx.app();

    // Catch up on a phase that ran out since the last invocation.
    let mut events = app.tick();
    match action {
        TimerAction::Start => events.extend(app.start_focus()),
        TimerAction::Break => events.extend(app.start_break()),
        TimerAction::ManualBreak => events.extend(app.start_manual_break()),
        TimerAction::EndBreak => events.extend(app.end_break_early()),
        TimerAction::Pause => events.extend(app.pause()),
        TimerAction::Resume => events.extend(app.resume()),
        TimerAction::Reset => events.extend(app.reset()),
        TimerAction::Status => {}
        TimerAction::Run => {
            print_events(&events)?;
            return run_foreground(&ctx, app);
        }
    }
    events.extend(app.progress_tick());
    app.flush();
    ctx.save_engine(app.timer())?;

    let output = serde_json::json!({
        "events": events,
        "state": app.snapshot(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_foreground(ctx: &Context, mut app: FocusApp) -> Result<()> {
    if app.timer().phase() == TimerPhase::Idle {
        print_events(&app.start_focus())?;
    } else if app.timer().started_at_ms().is_none() {
        print_events(&app.resume())?;
    }
    ctx.save_engine(app.timer())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(drive(
        &mut app,
        ctx.config.timer.tick_interval_ms,
        ctx.config.timer.progress_interval_ms,
    ));

    app.flush();
    ctx.save_engine(app.timer())?;
    eprintln!();
    result
}

/// Tick the countdown and progress on their own intervals until the timer
/// goes idle or the user interrupts. An interrupted timer keeps running on
/// the wall clock and can be picked up by the next command.
async fn drive(app: &mut FocusApp, tick_ms: u64, progress_ms: u64) -> Result<()> {
    let mut countdown = tokio::time::interval(Duration::from_millis(tick_ms.max(10)));
    countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut progress = tokio::time::interval(Duration::from_millis(progress_ms.max(10)));
    progress.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break;
            }
            _ = countdown.tick() => {
                print_events(&app.tick())?;
                if app.timer().phase() == TimerPhase::Idle {
                    break;
                }
            }
            _ = progress.tick() => {
                print_events(&app.progress_tick())?;
                let timer = app.timer();
                eprint!(
                    "\r{:<14} {}",
                    timer.phase_label(),
                    timer.time_label(app.preferences())
                );
            }
        }
    }
    Ok(())
}

fn print_events(events: &[Event]) -> Result<()> {
    for event in events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}
