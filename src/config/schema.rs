use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/rondo/config.toml` or `~/.config/rondo/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `RONDO__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub playback: PlaybackSettings,
    pub notification: NotificationSettings,
    pub storage: StorageSettings,
    pub access: AccessSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Directory scanned when no directory is given on the command line.
    pub music_dir: Option<PathBuf>,
    /// Load the catalog from this JSON document instead of scanning.
    pub catalog_json: Option<PathBuf>,
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            music_dir: None,
            catalog_json: None,
            extensions: vec![
                "mp3".into(),
                "flac".into(),
                "wav".into(),
                "ogg".into(),
                "m4a".into(),
            ],
            follow_links: true,
            include_hidden: true,
            recursive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// What happens when a track finishes on its own.
    pub repeat: RepeatModeSetting,
    /// Restore the last playlist and position from the state store at startup.
    pub resume_on_start: bool,
    /// Output level while another app holds audio focus with ducking (0.0..=1.0).
    pub duck_volume: f32,
    /// Give up on a track whose prepare has not completed after this many
    /// milliseconds. Unset waits forever.
    pub prepare_timeout_ms: Option<u64>,
    /// Fade-out duration when quitting (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            repeat: RepeatModeSetting::All,
            resume_on_start: true,
            duck_volume: 0.1,
            prepare_timeout_ms: Some(15_000),
            quit_fade_out_ms: 500,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatModeSetting {
    #[serde(alias = "no_loop", alias = "no-loop", alias = "none")]
    Off,
    #[serde(alias = "loop_all", alias = "loop-all", alias = "loop-around")]
    All,
    #[serde(alias = "loop_one", alias = "loop-one", alias = "repeat-one")]
    One,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackDisplayField {
    Title,
    Artist,
    Album,
    Genre,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Fields composing the notification title line, in order.
    ///
    /// Example: ["title"]
    pub title_fields: Vec<TrackDisplayField>,
    /// Fields composing the notification body line, in order.
    ///
    /// Example: ["artist", "album"]
    pub text_fields: Vec<TrackDisplayField>,
    /// Separator used to join the fields of one line.
    pub separator: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            title_fields: vec![TrackDisplayField::Title],
            text_fields: vec![TrackDisplayField::Artist, TrackDisplayField::Album],
            separator: " - ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding the session state file. Defaults to
    /// `$XDG_STATE_HOME/rondo` or `~/.local/state/rondo`.
    pub state_dir: Option<PathBuf>,
    /// Key under which the playlist and index are stored.
    pub namespace: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            state_dir: None,
            namespace: "rondo.session".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AllowedCaller {
    pub package: String,
    /// Restrict the entry to one uid. Unset matches any uid.
    pub uid: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessSettings {
    /// Callers allowed to browse in addition to root, the system uid and
    /// this process's own uid.
    pub allowed_callers: Vec<AllowedCaller>,
    /// Advertise search to callers that are not allowed to browse.
    pub allow_unknown_search: bool,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            allowed_callers: Vec::new(),
            allow_unknown_search: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Write logs to daily files in this directory instead of stderr.
    pub directory: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: None,
            default_filter: "rondo=info,warn".to_string(),
        }
    }
}
