use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::library::{CatalogLoader, MusicSource};
use crate::session::PlaybackSession;

use super::control::ControlCmd;

/// How long the loop sleeps between timeout checks when idle.
pub const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The single dispatch thread. Owns the session; every command, player
/// event and catalog completion is handled here one at a time.
pub struct EventLoop {
    session: PlaybackSession,
    source: Arc<MusicSource>,
    loader: Option<Arc<dyn CatalogLoader>>,
    tx: Sender<ControlCmd>,
    rx: Receiver<ControlCmd>,
}

impl EventLoop {
    pub fn new(
        session: PlaybackSession,
        source: Arc<MusicSource>,
        loader: Option<Arc<dyn CatalogLoader>>,
        tx: Sender<ControlCmd>,
        rx: Receiver<ControlCmd>,
    ) -> Self {
        Self {
            session,
            source,
            loader,
            tx,
            rx,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// Kick off a catalog load on a worker thread. The result comes back as
    /// [`ControlCmd::CatalogLoaded`], so readiness actions run on this
    /// thread.
    pub fn start_catalog_load(&self) -> Result<()> {
        let Some(loader) = self.loader.clone() else {
            warn!("no catalog configured");
            self.source.begin_load()?;
            self.source
                .finish_load(Err(Error::SourceLoad("no catalog configured".to_string())));
            return Ok(());
        };
        self.source.begin_load()?;

        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name("rondo-catalog".into())
            .spawn(move || {
                let outcome = loader.load();
                let _ = tx.send(ControlCmd::CatalogLoaded(outcome));
            });
        if let Err(e) = spawned {
            self.source.finish_load(Err(Error::SourceLoad(e.to_string())));
            return Err(e.into());
        }
        Ok(())
    }

    pub fn dispatch(&mut self, cmd: ControlCmd) -> Flow {
        match cmd {
            ControlCmd::Transport(cmd) => {
                if let Err(e) = self.session.handle(cmd) {
                    warn!(error = %e, "command rejected");
                }
            }
            ControlCmd::CatalogLoaded(outcome) => self.source.finish_load(outcome),
            ControlCmd::Reload => {
                if let Err(e) = self.start_catalog_load() {
                    warn!(error = %e, "reload not started");
                }
            }
            ControlCmd::Player(event) => self.session.on_player_event(event),
            ControlCmd::Focus(change) => self.session.on_audio_focus(change),
            ControlCmd::Call(state) => self.session.on_call_state(state),
            ControlCmd::BecomingNoisy => self.session.on_becoming_noisy(),
            ControlCmd::Quit => {
                info!("quitting");
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    /// Handle at most one command, waiting up to `timeout` for it.
    pub fn turn(&mut self, timeout: Duration) -> Flow {
        let flow = match self.rx.recv_timeout(timeout) {
            Ok(cmd) => self.dispatch(cmd),
            Err(RecvTimeoutError::Timeout) => Flow::Continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("control channel closed");
                Flow::Quit
            }
        };
        if flow == Flow::Continue && self.session.check_prepare_timeout(Instant::now()) {
            warn!("prepare timed out");
        }
        flow
    }

    /// Run until [`ControlCmd::Quit`] and hand the session back. The
    /// player is left as it was so dropping it can fade out.
    pub fn run(mut self) -> PlaybackSession {
        while self.turn(TICK) == Flow::Continue {}
        self.session
    }
}
