use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};
use crate::session::{Player, PlayerEvent};

use super::thread::spawn_audio_thread;
use super::types::{AudioCmd, Clock, ClockHandle};

/// [`Player`] backed by `rodio`, running on its own thread.
///
/// The output device is opened on the first prepare and closed on release,
/// so an idle daemon holds no audio resources.
pub struct RodioPlayer {
    tx: Sender<AudioCmd>,
    clock: ClockHandle,
    join: Mutex<Option<JoinHandle<()>>>,
    quit_fade_out: Duration,
}

impl RodioPlayer {
    /// Spawn the audio thread. `events` is called on that thread for every
    /// prepare, completion and failure. Playback fades out over
    /// `quit_fade_out` when the player is shut down.
    pub fn spawn<F>(events: F, quit_fade_out: Duration) -> Result<Self>
    where
        F: Fn(PlayerEvent) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let clock: ClockHandle = Arc::new(Mutex::new(Clock::default()));
        let join = spawn_audio_thread(rx, clock.clone(), Box::new(events))?;

        Ok(Self {
            tx,
            clock,
            join: Mutex::new(Some(join)),
            quit_fade_out,
        })
    }

    fn send(&self, cmd: AudioCmd) {
        if self.tx.send(cmd).is_err() {
            warn!("audio thread is gone");
        }
    }

    /// Fade out, close the output and wait for the audio thread to exit.
    /// Later calls do nothing.
    pub fn quit_softly(&self) {
        let handle = match self.join.lock() {
            Ok(mut j) => j.take(),
            Err(e) => e.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };
        self.send(AudioCmd::Quit {
            fade_out_ms: self.quit_fade_out.as_millis() as u64,
        });
        let _ = handle.join();
    }
}

impl Drop for RodioPlayer {
    fn drop(&mut self) {
        self.quit_softly();
    }
}

impl Player for RodioPlayer {
    fn prepare(&mut self, generation: u64, locator: &str) -> Result<()> {
        self.tx
            .send(AudioCmd::Prepare {
                generation,
                locator: locator.to_string(),
            })
            .map_err(|_| Error::Playback("audio thread is gone".to_string()))
    }

    fn start(&mut self) {
        self.send(AudioCmd::Start);
    }

    fn pause(&mut self) {
        self.send(AudioCmd::Pause);
    }

    fn seek_to(&mut self, position_ms: u64) {
        // Update the clock right away so position reads agree with the
        // session before the audio thread catches up.
        if let Ok(mut clock) = self.clock.lock() {
            clock.reset(Duration::from_millis(position_ms));
        }
        self.send(AudioCmd::SeekTo(Duration::from_millis(position_ms)));
    }

    fn stop(&mut self) {
        self.send(AudioCmd::Stop);
    }

    fn release(&mut self) {
        self.send(AudioCmd::Release);
    }

    fn set_volume(&mut self, volume: f32) {
        self.send(AudioCmd::SetVolume(volume));
    }

    fn position_ms(&self) -> u64 {
        self.clock
            .lock()
            .map(|c| c.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }
}
