//! Small enums shared by the session, the hub and the transport surfaces.

use crate::library::SearchFocus;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// No playlist selected yet.
    #[default]
    Idle,
    /// The player is preparing the current track.
    Preparing,
    Playing,
    Paused,
    /// Stopped by a command or focus loss. Only a new play command leaves it.
    Stopped,
    /// The player reported a failure and was released.
    Error,
}

impl PlaybackStatus {
    /// Whether the session currently holds audio output.
    pub fn is_active(self) -> bool {
        matches!(self, PlaybackStatus::Preparing | PlaybackStatus::Playing)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum RepeatMode {
    /// Stop after the last track of the playlist.
    Off,
    /// Wrap around to the start of the playlist.
    #[default]
    All,
    /// Repeat the current track when it ends.
    One,
}

impl From<crate::config::RepeatModeSetting> for RepeatMode {
    fn from(setting: crate::config::RepeatModeSetting) -> Self {
        match setting {
            crate::config::RepeatModeSetting::Off => RepeatMode::Off,
            crate::config::RepeatModeSetting::All => RepeatMode::All,
            crate::config::RepeatModeSetting::One => RepeatMode::One,
        }
    }
}

/// Telephony state as reported by the platform.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Ringing,
    OffHook,
}

/// Audio focus transitions as reported by the platform.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FocusChange {
    Gain,
    /// Lost for an unbounded time. Playback stops and the player is released.
    Loss,
    /// Lost for a short time. Playback pauses and resumes on regain.
    LossTransient,
    /// Another app plays briefly over us; keep going at a lower level.
    LossTransientCanDuck,
}

/// A command from any controller (lock screen, media keys, voice, CLI).
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Play,
    Pause,
    PlayPause,
    PlayFromId(String),
    PlayFromSearch {
        query: String,
        focus: Option<SearchFocus>,
    },
    SkipNext,
    SkipPrevious,
    SeekTo(u64),
    /// Relative seek in milliseconds, clamped at the start of the track.
    SeekBy(i64),
    Stop,
}
