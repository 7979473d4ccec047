use crate::error::Result;

/// Outcome of an asynchronous player operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEventKind {
    /// The track handed to [`Player::prepare`] is ready to start.
    Prepared,
    /// The track played to its end.
    Completed,
    /// Decode or output failure.
    Failed(String),
}

/// Callback from the player, tagged with the generation passed to
/// [`Player::prepare`] so that events for a cancelled prepare can be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEvent {
    pub generation: u64,
    pub kind: PlayerEventKind,
}

impl PlayerEvent {
    pub fn prepared(generation: u64) -> Self {
        Self {
            generation,
            kind: PlayerEventKind::Prepared,
        }
    }

    pub fn completed(generation: u64) -> Self {
        Self {
            generation,
            kind: PlayerEventKind::Completed,
        }
    }

    pub fn failed(generation: u64, msg: impl Into<String>) -> Self {
        Self {
            generation,
            kind: PlayerEventKind::Failed(msg.into()),
        }
    }
}

/// The decode/output engine. The session drives it; it reports back through
/// [`PlayerEvent`]s delivered to the session's dispatch thread.
pub trait Player: Send {
    /// Start loading `locator`. Completion is reported with the same
    /// `generation`. An `Err` means the request could not even be issued.
    fn prepare(&mut self, generation: u64, locator: &str) -> Result<()>;

    fn start(&mut self);

    fn pause(&mut self);

    fn seek_to(&mut self, position_ms: u64);

    /// Halt output. The loaded track may be dropped.
    fn stop(&mut self);

    /// Free every resource held for playback.
    fn release(&mut self);

    /// Output level in `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32);

    fn position_ms(&self) -> u64;
}
