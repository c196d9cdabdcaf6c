//! Break sound cues.
//!
//! Only two cues exist. Each plays only when sounds are enabled and its own
//! toggle is on. A failing source is warned about once and then ignored.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::preferences::Preferences;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SoundCue {
    BreakStart,
    BreakEnd,
}

impl SoundCue {
    pub fn key(self) -> &'static str {
        match self {
            SoundCue::BreakStart => "breakStart",
            SoundCue::BreakEnd => "breakEnd",
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            SoundCue::BreakStart => "break-start.mp3",
            SoundCue::BreakEnd => "break-end.mp3",
        }
    }

    /// Older installs shipped the break-end cue under another name.
    pub fn legacy_source(self) -> Option<&'static str> {
        match self {
            SoundCue::BreakStart => None,
            SoundCue::BreakEnd => Some("break-complete.mp3"),
        }
    }

    pub fn is_enabled(self, prefs: &Preferences) -> bool {
        if !prefs.sound_enabled {
            return false;
        }
        match self {
            SoundCue::BreakStart => prefs.break_start_sound,
            SoundCue::BreakEnd => prefs.break_end_sound,
        }
    }
}

/// Platform audio backend.
pub trait SoundPlayer: Send + Sync {
    fn play(&self, source: &str) -> Result<(), ServiceError>;
}

/// Plays nothing and always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPlayer;

impl SoundPlayer for SilentPlayer {
    fn play(&self, _source: &str) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Plays files from a directory with the first audio command that plays
/// them successfully. Playback blocks until the player exits, so a player
/// that starts but cannot decode the file counts as a failure.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    dir: PathBuf,
    commands: Vec<String>,
}

impl CommandPlayer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            commands: ["paplay", "aplay", "afplay"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands = commands.into_iter().map(Into::into).collect();
        self
    }
}

impl SoundPlayer for CommandPlayer {
    fn play(&self, source: &str) -> Result<(), ServiceError> {
        let path = self.dir.join(source);
        let failed = |message: String| ServiceError::Playback {
            source_name: source.to_string(),
            message,
        };
        if !path.is_file() {
            return Err(failed(format!("{} not found", path.display())));
        }

        let mut last_error = String::from("no audio player available");
        for cmd in &self.commands {
            let status = Command::new(cmd)
                .arg(&path)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            match status {
                Ok(status) if status.success() => return Ok(()),
                Ok(status) => last_error = format!("{cmd} exited with {status}"),
                Err(err) => tracing::trace!(cmd = %cmd, error = %err, "audio player unavailable"),
            }
        }
        Err(failed(last_error))
    }
}

pub struct SoundService {
    player: Box<dyn SoundPlayer>,
    warned: HashSet<String>,
}

impl SoundService {
    pub fn new(player: Box<dyn SoundPlayer>) -> Self {
        Self {
            player,
            warned: HashSet::new(),
        }
    }

    pub fn silent() -> Self {
        Self::new(Box::new(SilentPlayer))
    }

    pub fn play_break_start(&mut self, prefs: &Preferences) -> bool {
        self.play(SoundCue::BreakStart, prefs)
    }

    pub fn play_break_end(&mut self, prefs: &Preferences) -> bool {
        self.play(SoundCue::BreakEnd, prefs)
    }

    /// Returns whether some source for the cue played.
    pub fn play(&mut self, cue: SoundCue, prefs: &Preferences) -> bool {
        if !cue.is_enabled(prefs) {
            return false;
        }
        if self.try_play(cue, cue.source()) {
            return true;
        }
        match cue.legacy_source() {
            Some(legacy) => self.try_play(cue, legacy),
            None => false,
        }
    }

    fn try_play(&mut self, cue: SoundCue, source: &str) -> bool {
        match self.player.play(source) {
            Ok(()) => true,
            Err(err) => {
                let warn_key = format!("{}:{source}", cue.key());
                if self.warned.insert(warn_key.clone()) {
                    tracing::warn!(source = %warn_key, error = %err, "Failed to play sound");
                }
                false
            }
        }
    }

    /// Sources that have failed at least once, as `cue:source`.
    pub fn failed_sources(&self) -> impl Iterator<Item = &str> {
        self.warned.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct ScriptedPlayer {
        broken: Vec<&'static str>,
        attempts: Mutex<Vec<String>>,
    }

    impl SoundPlayer for Arc<ScriptedPlayer> {
        fn play(&self, source: &str) -> Result<(), ServiceError> {
            self.attempts.lock().unwrap().push(source.to_string());
            if self.broken.iter().any(|b| *b == source) {
                Err(ServiceError::Playback {
                    source_name: source.into(),
                    message: "decode error".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn respects_sound_toggles() {
        let player = Arc::new(ScriptedPlayer::default());
        let mut sounds = SoundService::new(Box::new(player.clone()));
        let mut prefs = Preferences::default();

        assert!(sounds.play_break_start(&prefs));
        prefs.break_start_sound = false;
        assert!(!sounds.play_break_start(&prefs));
        assert!(sounds.play_break_end(&prefs));
        prefs.sound_enabled = false;
        assert!(!sounds.play_break_end(&prefs));

        assert_eq!(
            *player.attempts.lock().unwrap(),
            vec!["break-start.mp3", "break-end.mp3"]
        );
    }

    #[test]
    fn break_end_falls_back_to_legacy_source() {
        let player = Arc::new(ScriptedPlayer {
            broken: vec!["break-end.mp3"],
            ..Default::default()
        });
        let mut sounds = SoundService::new(Box::new(player.clone()));
        assert!(sounds.play_break_end(&Preferences::default()));
        assert_eq!(
            *player.attempts.lock().unwrap(),
            vec!["break-end.mp3", "break-complete.mp3"]
        );
    }

    #[test]
    fn failures_are_recorded_once_per_source() {
        let player = Arc::new(ScriptedPlayer {
            broken: vec!["break-start.mp3"],
            ..Default::default()
        });
        let mut sounds = SoundService::new(Box::new(player));
        let prefs = Preferences::default();
        assert!(!sounds.play_break_start(&prefs));
        assert!(!sounds.play_break_start(&prefs));
        let failed: Vec<&str> = sounds.failed_sources().collect();
        assert_eq!(failed, vec!["breakStart:break-start.mp3"]);
    }

    #[test]
    fn command_player_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let player = CommandPlayer::new(dir.path());
        assert!(matches!(
            player.play("break-start.mp3"),
            Err(ServiceError::Playback { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn command_player_reports_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("break-start.mp3"), b"").unwrap();
        let player = CommandPlayer::new(dir.path()).with_commands(["false"]);
        assert!(matches!(
            player.play("break-start.mp3"),
            Err(ServiceError::Playback { .. })
        ));
        let player = CommandPlayer::new(dir.path()).with_commands(["false", "true"]);
        assert!(player.play("break-start.mp3").is_ok());
    }

    /// `sh` as the player: each cue file is a script whose exit code
    /// decides whether playback succeeded.
    #[cfg(unix)]
    #[test]
    fn failing_player_exit_falls_back_to_legacy_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("break-end.mp3"), "exit 1\n").unwrap();
        std::fs::write(dir.path().join("break-complete.mp3"), "exit 0\n").unwrap();
        let player = CommandPlayer::new(dir.path()).with_commands(["sh"]);
        let mut sounds = SoundService::new(Box::new(player));
        let prefs = Preferences::default();

        assert!(sounds.play_break_end(&prefs));
        assert!(sounds.play_break_end(&prefs));
        let failed: Vec<&str> = sounds.failed_sources().collect();
        assert_eq!(failed, vec!["breakEnd:break-end.mp3"]);
    }

    #[cfg(unix)]
    #[test]
    fn every_source_failing_is_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        for file in ["break-end.mp3", "break-complete.mp3"] {
            std::fs::write(dir.path().join(file), "exit 3\n").unwrap();
        }
        let player = CommandPlayer::new(dir.path()).with_commands(["sh"]);
        let mut sounds = SoundService::new(Box::new(player));
        let prefs = Preferences::default();

        assert!(!sounds.play_break_end(&prefs));
        assert!(!sounds.play_break_end(&prefs));
        let mut failed: Vec<&str> = sounds.failed_sources().collect();
        failed.sort_unstable();
        assert_eq!(
            failed,
            vec!["breakEnd:break-complete.mp3", "breakEnd:break-end.mp3"]
        );
    }

    #[test]
    fn command_player_errors_when_no_command_starts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("break-end.mp3"), b"").unwrap();
        let player = CommandPlayer::new(dir.path()).with_commands(["focalite-no-such-player"]);
        assert!(player.play("break-end.mp3").is_err());
    }
}
