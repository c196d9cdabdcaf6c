//! Side-effect services driven by timer events.

mod notifications;
mod sounds;

pub use notifications::{LogNotifier, NotificationService, NotificationSink};
pub use sounds::{CommandPlayer, SilentPlayer, SoundCue, SoundPlayer, SoundService};
