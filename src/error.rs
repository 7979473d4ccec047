//! Error types shared by the library, session and store layers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A requested track or browse node id does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The catalog could not be loaded.
    #[error("catalog load failed: {0}")]
    SourceLoad(String),

    /// The player reported a decode or I/O failure.
    #[error("playback failed: {0}")]
    Playback(String),

    /// The session is preparing a track and only accepts `stop`.
    #[error("session is busy preparing a track")]
    Busy,

    /// There is no playlist to start or resume.
    #[error("nothing to play")]
    NothingToPlay,

    /// `load()` was called while a load is already running.
    #[error("catalog load already in progress")]
    LoadInProgress,

    #[error("invalid media id: {0}")]
    InvalidMediaId(String),

    #[error("state store: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
