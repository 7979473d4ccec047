//! Commands and shared state of the audio thread.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::session::PlayerEvent;

#[derive(Debug)]
pub enum AudioCmd {
    /// Open and decode `locator`, leaving it paused at the start.
    Prepare { generation: u64, locator: String },
    /// Start or resume the loaded track.
    Start,
    Pause,
    /// Jump to an absolute position in the loaded track.
    SeekTo(Duration),
    /// Drop the loaded track.
    Stop,
    /// Drop the loaded track and close the output device.
    Release,
    SetVolume(f32),
    /// Quit the audio thread, fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

/// Playback clock for the loaded track.
///
/// Elapsed time is the accumulated time up to the last pause plus the time
/// since the last start.
#[derive(Debug, Default, Clone)]
pub struct Clock {
    accumulated: Duration,
    started_at: Option<Instant>,
}

impl Clock {
    pub fn elapsed(&self) -> Duration {
        self.accumulated + self.started_at.map_or(Duration::ZERO, |st| st.elapsed())
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    pub fn pause(&mut self) {
        if let Some(st) = self.started_at.take() {
            self.accumulated += st.elapsed();
        }
    }

    /// Set the position to `at`, keeping the running state.
    pub fn reset(&mut self, at: Duration) {
        let running = self.is_running();
        self.accumulated = at;
        self.started_at = running.then(Instant::now);
    }
}

pub type ClockHandle = Arc<Mutex<Clock>>;

/// Delivers player events back to whoever owns the session.
pub type EventSink = Box<dyn Fn(PlayerEvent) + Send>;
