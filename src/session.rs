//! Playback session: the state machine behind every transport surface.
//!
//! ```text
//! Idle -> Preparing -> Playing <-> Paused
//!             |           |          |
//!             +-----------+----------+--> Stopped
//! any ------------------------------> Error   (player failure)
//! ```

mod machine;
mod player;
mod types;

pub use machine::{PlaybackSession, SessionOptions};
pub use player::{Player, PlayerEvent, PlayerEventKind};
pub use types::{CallState, FocusChange, PlaybackStatus, RepeatMode, TransportCommand};

#[cfg(test)]
mod tests;
