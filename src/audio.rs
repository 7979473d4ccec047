//! rodio-backed player.
//!
//! Decoding and output run on a dedicated thread driven by [`AudioCmd`]s;
//! prepare, completion and failure are reported back as session
//! [`PlayerEvent`](crate::session::PlayerEvent)s.

mod player;
mod sink;
mod thread;
mod types;

pub use player::RodioPlayer;
pub use types::{AudioCmd, Clock};
