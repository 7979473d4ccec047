use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::session::PlayerEvent;

use super::sink::open_sink_at;
use super::types::{AudioCmd, Clock, ClockHandle, EventSink};

const POLL: Duration = Duration::from_millis(200);

struct Loaded {
    generation: u64,
    locator: String,
    sink: Sink,
    playing: bool,
}

struct AudioState {
    stream: Option<OutputStream>,
    loaded: Option<Loaded>,
    volume: f32,
    clock: ClockHandle,
    events: EventSink,
}

impl AudioState {
    fn stream(&mut self) -> Result<&OutputStream> {
        if self.stream.is_none() {
            let mut stream = OutputStreamBuilder::open_default_stream()
                .map_err(|e| Error::Playback(format!("no audio output device: {e}")))?;
            // rodio logs to stderr when OutputStream is dropped.
            stream.log_on_drop(false);
            info!("audio output opened");
            self.stream = Some(stream);
        }
        match self.stream.as_ref() {
            Some(s) => Ok(s),
            None => Err(Error::Playback("audio output unavailable".to_string())),
        }
    }

    fn with_clock(&self, f: impl FnOnce(&mut Clock)) {
        if let Ok(mut clock) = self.clock.lock() {
            f(&mut clock);
        }
    }

    fn prepare(&mut self, generation: u64, locator: String) {
        self.stop();
        let volume = self.volume;
        let opened = self
            .stream()
            .and_then(|stream| open_sink_at(stream, &locator, Duration::ZERO));
        match opened {
            Ok(sink) => {
                sink.set_volume(volume);
                debug!(generation, locator = %locator, "prepared");
                self.loaded = Some(Loaded {
                    generation,
                    locator,
                    sink,
                    playing: false,
                });
                self.with_clock(|c| *c = Default::default());
                (self.events)(PlayerEvent::prepared(generation));
            }
            Err(e) => {
                warn!(generation, locator = %locator, error = %e, "prepare failed");
                (self.events)(PlayerEvent::failed(generation, e.to_string()));
            }
        }
    }

    fn start(&mut self) {
        if let Some(l) = self.loaded.as_mut() {
            l.sink.play();
            l.playing = true;
            self.with_clock(|c| c.start());
        }
    }

    fn pause(&mut self) {
        if let Some(l) = self.loaded.as_mut() {
            l.sink.pause();
            l.playing = false;
            self.with_clock(|c| c.pause());
        }
    }

    /// Rebuild the current sink and skip into the file.
    fn seek_to(&mut self, at: Duration) {
        let Some(l) = self.loaded.take() else {
            return;
        };
        l.sink.stop();
        let volume = self.volume;
        let reopened = self
            .stream()
            .and_then(|stream| open_sink_at(stream, &l.locator, at));
        match reopened {
            Ok(sink) => {
                sink.set_volume(volume);
                if l.playing {
                    sink.play();
                }
                self.loaded = Some(Loaded { sink, ..l });
                self.with_clock(|c| c.reset(at));
            }
            Err(e) => {
                warn!(error = %e, "seek failed");
                (self.events)(PlayerEvent::failed(l.generation, e.to_string()));
            }
        }
    }

    fn stop(&mut self) {
        if let Some(l) = self.loaded.take() {
            l.sink.stop();
        }
        self.with_clock(|c| *c = Default::default());
    }

    fn release(&mut self) {
        self.stop();
        if self.stream.take().is_some() {
            info!("audio output released");
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(l) = self.loaded.as_ref() {
            l.sink.set_volume(self.volume);
        }
    }

    /// Report completion once the playing sink runs dry.
    fn poll_completion(&mut self) {
        let finished = match self.loaded.as_ref() {
            Some(l) => l.playing && l.sink.empty(),
            None => false,
        };
        if !finished {
            return;
        }
        if let Some(l) = self.loaded.as_mut() {
            l.playing = false;
            let generation = l.generation;
            self.with_clock(|c| c.pause());
            debug!(generation, "track completed");
            (self.events)(PlayerEvent::completed(generation));
        }
    }

    fn fade_out(&self, fade_out_ms: u64) {
        let Some(l) = self.loaded.as_ref() else {
            return;
        };
        if !l.playing || fade_out_ms == 0 {
            l.sink.set_volume(0.0);
            return;
        }
        let steps: u64 = 20;
        let step_ms = (fade_out_ms / steps).max(1);
        for step in 1..=steps {
            let t = step as f32 / steps as f32;
            l.sink.set_volume(self.volume * (1.0 - t));
            thread::sleep(Duration::from_millis(step_ms));
        }
        l.sink.set_volume(0.0);
    }
}

pub(super) fn spawn_audio_thread(
    rx: Receiver<AudioCmd>,
    clock: ClockHandle,
    events: EventSink,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("rondo-audio".into())
        .spawn(move || {
            let mut state = AudioState {
                stream: None,
                loaded: None,
                volume: 1.0,
                clock,
                events,
            };

            loop {
                match rx.recv_timeout(POLL) {
                    Ok(AudioCmd::Prepare {
                        generation,
                        locator,
                    }) => state.prepare(generation, locator),
                    Ok(AudioCmd::Start) => state.start(),
                    Ok(AudioCmd::Pause) => state.pause(),
                    Ok(AudioCmd::SeekTo(at)) => state.seek_to(at),
                    Ok(AudioCmd::Stop) => state.stop(),
                    Ok(AudioCmd::Release) => state.release(),
                    Ok(AudioCmd::SetVolume(v)) => state.set_volume(v),
                    Ok(AudioCmd::Quit { fade_out_ms }) => {
                        state.fade_out(fade_out_ms);
                        state.release();
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) => state.poll_completion(),
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("audio thread exiting");
        })
}
