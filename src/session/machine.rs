use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::PlaybackSettings;
use crate::error::{Error, Result};
use crate::hub::SessionConnection;
use crate::library::playlist::resolve_playlist;
use crate::library::{MusicSource, SearchFocus, TrackRecord};
use crate::notification::Notifier;
use crate::store::PositionStore;

use super::player::{Player, PlayerEvent, PlayerEventKind};
use super::types::{CallState, FocusChange, PlaybackStatus, RepeatMode, TransportCommand};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    pub repeat: RepeatMode,
    pub duck_volume: f32,
    pub prepare_timeout: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            repeat: RepeatMode::All,
            duck_volume: 0.1,
            prepare_timeout: None,
        }
    }
}

impl From<&PlaybackSettings> for SessionOptions {
    fn from(p: &PlaybackSettings) -> Self {
        Self {
            repeat: p.repeat.into(),
            duck_volume: p.duck_volume,
            prepare_timeout: p.prepare_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// The playback state machine.
///
/// Owned by the dispatch thread; every command, player callback and
/// platform event goes through `&mut self`, so they are serialized by
/// construction. Each change of status or current track is pushed to the
/// [`SessionConnection`] before the method returns.
pub struct PlaybackSession {
    source: Arc<MusicSource>,
    connection: Arc<SessionConnection>,
    player: Box<dyn Player>,
    store: Box<dyn PositionStore>,
    notifier: Notifier,
    options: SessionOptions,

    playlist: Vec<TrackRecord>,
    current_index: Option<usize>,
    status: PlaybackStatus,
    position_ms: u64,

    /// Tags the in-flight prepare. Bumped on every prepare, stop and failure
    /// so late player events can be told apart.
    generation: u64,
    /// The player holds resources that need a `release`.
    player_active: bool,
    preparing_since: Option<Instant>,
    /// Land in `Paused` instead of `Playing` when the prepare completes.
    hold_after_prepare: bool,
    ongoing_call: bool,
    focus_paused: bool,
    ducked: bool,
}

impl PlaybackSession {
    pub fn new(
        source: Arc<MusicSource>,
        connection: Arc<SessionConnection>,
        player: Box<dyn Player>,
        store: Box<dyn PositionStore>,
        options: SessionOptions,
    ) -> Self {
        Self {
            source,
            connection,
            player,
            store,
            notifier: Notifier::default(),
            options,
            playlist: Vec::new(),
            current_index: None,
            status: PlaybackStatus::Idle,
            position_ms: 0,
            generation: 0,
            player_active: false,
            preparing_since: None,
            hold_after_prepare: false,
            ongoing_call: false,
            focus_paused: false,
            ducked: false,
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn playlist(&self) -> &[TrackRecord] {
        &self.playlist
    }

    pub fn current_track(&self) -> Option<&TrackRecord> {
        self.current_index.and_then(|i| self.playlist.get(i))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn position_ms(&self) -> u64 {
        if self.status == PlaybackStatus::Playing {
            self.player.position_ms()
        } else {
            self.position_ms
        }
    }

    /// Dispatch a transport command.
    pub fn handle(&mut self, cmd: TransportCommand) -> Result<()> {
        debug!(?cmd, status = ?self.status, "transport command");
        match cmd {
            TransportCommand::Play => self.play(),
            TransportCommand::Pause => self.pause(),
            TransportCommand::PlayPause => {
                if self.status == PlaybackStatus::Playing {
                    self.pause()
                } else {
                    self.play()
                }
            }
            TransportCommand::PlayFromId(id) => self.play_from_id(&id),
            TransportCommand::PlayFromSearch { query, focus } => {
                self.play_from_search(&query, focus.as_ref())
            }
            TransportCommand::SkipNext => self.skip_next(),
            TransportCommand::SkipPrevious => self.skip_previous(),
            TransportCommand::SeekTo(ms) => self.seek_to(ms),
            TransportCommand::SeekBy(delta) => {
                let target = self.position_ms().saturating_add_signed(delta);
                self.seek_to(target)
            }
            TransportCommand::Stop => {
                self.stop();
                Ok(())
            }
        }
    }

    /// Load the last playlist and selection from the store without starting
    /// playback. Returns whether anything was restored.
    pub fn restore(&mut self) -> Result<bool> {
        if self.status != PlaybackStatus::Idle {
            return Ok(false);
        }
        let saved = self.store.load()?;
        if saved.current().is_none() {
            debug!("nothing to restore");
            return Ok(false);
        }
        info!(tracks = saved.playlist.len(), index = ?saved.index, "restored session");
        self.playlist = saved.playlist;
        self.current_index = saved.index;
        self.publish();
        Ok(true)
    }

    /// Play `media_id` (a track id or a hierarchical media id). Tracks picked
    /// from an album play within that album; anything else plays in catalog
    /// order.
    pub fn play_from_id(&mut self, media_id: &str) -> Result<()> {
        self.ensure_not_preparing()?;
        let catalog = self.source.tracks();
        let Some((track_id, playlist)) = resolve_playlist(media_id, &catalog) else {
            warn!(media_id, "no such track");
            return Err(Error::NotFound(media_id.to_string()));
        };
        let index = playlist
            .iter()
            .position(|t| t.id == track_id)
            .ok_or_else(|| Error::NotFound(track_id.clone()))?;

        self.set_playlist(playlist, index);
        self.prepare_current()
    }

    pub fn play_from_search(&mut self, query: &str, focus: Option<&SearchFocus>) -> Result<()> {
        self.ensure_not_preparing()?;
        let results = self.source.search(query, focus);
        if results.is_empty() {
            info!(query, ?focus, "search found nothing to play");
            return Err(Error::NotFound(query.to_string()));
        }
        self.set_playlist(results, 0);
        self.prepare_current()
    }

    /// Resume when paused; otherwise start the current (or last stored)
    /// track from the beginning.
    pub fn play(&mut self) -> Result<()> {
        match self.status {
            PlaybackStatus::Preparing => Err(Error::Busy),
            PlaybackStatus::Playing => Ok(()),
            PlaybackStatus::Paused => {
                self.ongoing_call = false;
                self.focus_paused = false;
                self.resume();
                Ok(())
            }
            PlaybackStatus::Idle | PlaybackStatus::Stopped | PlaybackStatus::Error => {
                if self.current_track().is_none() {
                    let saved = self.store.load()?;
                    if saved.current().is_none() {
                        return Err(Error::NothingToPlay);
                    }
                    self.playlist = saved.playlist;
                    self.current_index = saved.index;
                }
                self.prepare_current()
            }
        }
    }

    /// Pause from `Playing`. A pause while already paused by an interruption
    /// turns it into a user pause, which is never resumed automatically.
    pub fn pause(&mut self) -> Result<()> {
        match self.status {
            PlaybackStatus::Preparing => Err(Error::Busy),
            PlaybackStatus::Playing => {
                self.ongoing_call = false;
                self.focus_paused = false;
                self.suspend();
                Ok(())
            }
            PlaybackStatus::Paused => {
                self.ongoing_call = false;
                self.focus_paused = false;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn skip_next(&mut self) -> Result<()> {
        self.skip(true)
    }

    pub fn skip_previous(&mut self) -> Result<()> {
        self.skip(false)
    }

    fn skip(&mut self, forward: bool) -> Result<()> {
        self.ensure_not_preparing()?;
        let len = self.playlist.len();
        if len == 0 {
            return Err(Error::NothingToPlay);
        }
        let next = match (self.current_index, forward) {
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
            (None, true) => 0,
            (None, false) => len - 1,
        };
        self.current_index = Some(next);
        self.persist_index();
        self.prepare_current()
    }

    pub fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        self.ensure_not_preparing()?;
        if !matches!(self.status, PlaybackStatus::Playing | PlaybackStatus::Paused) {
            debug!(status = ?self.status, "seek ignored");
            return Ok(());
        }
        let target = match self.current_track() {
            Some(t) if t.has_known_duration() => position_ms.min(t.duration_ms as u64),
            _ => position_ms,
        };
        self.player.seek_to(target);
        self.position_ms = target;
        self.connection.position_ms.set(target);
        Ok(())
    }

    /// Cancel any in-flight prepare, release the player and enter `Stopped`.
    /// Stopping twice releases once.
    pub fn stop(&mut self) {
        if self.status == PlaybackStatus::Idle && !self.player_active {
            return;
        }
        if self.status == PlaybackStatus::Stopped {
            return;
        }
        self.generation += 1;
        self.release_player();
        self.position_ms = 0;
        self.preparing_since = None;
        self.hold_after_prepare = false;
        self.ongoing_call = false;
        self.focus_paused = false;
        info!("playback stopped");
        self.set_status(PlaybackStatus::Stopped);
    }

    pub fn on_player_event(&mut self, event: PlayerEvent) {
        if event.generation != self.generation {
            debug!(
                event = event.generation,
                current = self.generation,
                "stale player event dropped"
            );
            return;
        }
        match event.kind {
            PlayerEventKind::Prepared => {
                if self.status != PlaybackStatus::Preparing {
                    return;
                }
                self.preparing_since = None;
                self.player.set_volume(self.volume());
                if self.hold_after_prepare {
                    self.hold_after_prepare = false;
                    self.position_ms = 0;
                    self.set_status(PlaybackStatus::Paused);
                } else {
                    self.player.start();
                    self.set_status(PlaybackStatus::Playing);
                }
            }
            PlayerEventKind::Completed => {
                if self.status == PlaybackStatus::Playing {
                    self.advance_after_completion();
                }
            }
            PlayerEventKind::Failed(msg) => self.fail(msg),
        }
    }

    /// Fail a prepare that has outlived the configured timeout. Returns
    /// whether it fired.
    pub fn check_prepare_timeout(&mut self, now: Instant) -> bool {
        let (Some(since), Some(limit)) = (self.preparing_since, self.options.prepare_timeout) else {
            return false;
        };
        if self.status != PlaybackStatus::Preparing || now.duration_since(since) < limit {
            return false;
        }
        self.fail(format!("prepare timed out after {} ms", limit.as_millis()));
        true
    }

    pub fn on_call_state(&mut self, state: CallState) {
        debug!(?state, status = ?self.status, "call state");
        match state {
            CallState::Ringing | CallState::OffHook => match self.status {
                PlaybackStatus::Playing => {
                    self.suspend();
                    self.ongoing_call = true;
                }
                PlaybackStatus::Preparing => {
                    self.hold_after_prepare = true;
                    self.ongoing_call = true;
                }
                PlaybackStatus::Paused if self.focus_paused => self.ongoing_call = true,
                _ => {}
            },
            CallState::Idle => {
                if self.ongoing_call {
                    self.ongoing_call = false;
                    self.resume_if_uninterrupted();
                }
            }
        }
    }

    pub fn on_audio_focus(&mut self, change: FocusChange) {
        debug!(?change, status = ?self.status, "audio focus");
        match change {
            FocusChange::Gain => {
                if self.ducked {
                    self.ducked = false;
                    if self.player_active {
                        self.player.set_volume(1.0);
                    }
                }
                if self.focus_paused {
                    self.focus_paused = false;
                    self.resume_if_uninterrupted();
                }
            }
            FocusChange::Loss => {
                if matches!(
                    self.status,
                    PlaybackStatus::Preparing | PlaybackStatus::Playing | PlaybackStatus::Paused
                ) {
                    self.stop();
                }
            }
            FocusChange::LossTransient => match self.status {
                PlaybackStatus::Playing => {
                    self.suspend();
                    self.focus_paused = true;
                }
                PlaybackStatus::Preparing => {
                    self.hold_after_prepare = true;
                    self.focus_paused = true;
                }
                PlaybackStatus::Paused if self.ongoing_call => self.focus_paused = true,
                _ => {}
            },
            FocusChange::LossTransientCanDuck => {
                self.ducked = true;
                if self.player_active {
                    self.player.set_volume(self.options.duck_volume);
                }
            }
        }
    }

    /// Audio output is about to switch to the speaker (headphones pulled).
    /// Pauses without marking an interruption, so nothing resumes it.
    pub fn on_becoming_noisy(&mut self) {
        match self.status {
            PlaybackStatus::Playing => self.suspend(),
            PlaybackStatus::Preparing => self.hold_after_prepare = true,
            _ => {}
        }
        self.ongoing_call = false;
        self.focus_paused = false;
    }

    fn ensure_not_preparing(&self) -> Result<()> {
        if self.status == PlaybackStatus::Preparing {
            return Err(Error::Busy);
        }
        Ok(())
    }

    fn volume(&self) -> f32 {
        if self.ducked {
            self.options.duck_volume
        } else {
            1.0
        }
    }

    fn set_playlist(&mut self, playlist: Vec<TrackRecord>, index: usize) {
        self.playlist = playlist;
        self.current_index = Some(index);
        if let Err(e) = self.store.store(&self.playlist, self.current_index) {
            warn!(error = %e, "could not store playlist");
        }
    }

    fn persist_index(&mut self) {
        if let Err(e) = self.store.store_index(self.current_index) {
            warn!(error = %e, "could not store index");
        }
    }

    fn prepare_current(&mut self) -> Result<()> {
        let Some(track) = self.current_track().cloned() else {
            return Err(Error::NothingToPlay);
        };

        self.generation += 1;
        if self.player_active {
            self.player.stop();
        }
        self.player_active = true;
        self.position_ms = 0;
        self.hold_after_prepare = false;
        self.ongoing_call = false;
        self.focus_paused = false;
        self.preparing_since = Some(Instant::now());
        self.connection.error.set(None);
        self.set_status(PlaybackStatus::Preparing);

        info!(track_id = %track.id, generation = self.generation, "preparing");
        if let Err(e) = self.player.prepare(self.generation, &track.content_locator) {
            let msg = e.to_string();
            self.fail(msg.clone());
            return Err(Error::Playback(msg));
        }
        Ok(())
    }

    fn advance_after_completion(&mut self) {
        let (Some(i), len) = (self.current_index, self.playlist.len()) else {
            return;
        };
        match self.options.repeat {
            RepeatMode::One => {}
            RepeatMode::All => {
                self.current_index = Some((i + 1) % len);
                self.persist_index();
            }
            RepeatMode::Off => {
                if i + 1 >= len {
                    info!("end of playlist");
                    self.stop();
                    return;
                }
                self.current_index = Some(i + 1);
                self.persist_index();
            }
        }
        if let Err(e) = self.prepare_current() {
            warn!(error = %e, "could not advance");
        }
    }

    fn suspend(&mut self) {
        self.position_ms = self.player.position_ms();
        self.player.pause();
        self.set_status(PlaybackStatus::Paused);
    }

    fn resume(&mut self) {
        if self.player.position_ms() != self.position_ms {
            self.player.seek_to(self.position_ms);
        }
        self.player.set_volume(self.volume());
        self.player.start();
        self.set_status(PlaybackStatus::Playing);
    }

    fn resume_if_uninterrupted(&mut self) {
        if self.ongoing_call || self.focus_paused {
            return;
        }
        match self.status {
            PlaybackStatus::Paused => self.resume(),
            PlaybackStatus::Preparing => self.hold_after_prepare = false,
            _ => {}
        }
    }

    fn release_player(&mut self) {
        if self.player_active {
            self.player.stop();
            self.player.release();
            self.player_active = false;
        }
    }

    fn fail(&mut self, msg: String) {
        error!(error = %msg, "playback failed");
        self.generation += 1;
        self.release_player();
        self.preparing_since = None;
        self.hold_after_prepare = false;
        self.connection.error.set(Some(msg));
        self.set_status(PlaybackStatus::Error);
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        self.status = status;
        self.publish();
    }

    fn publish(&mut self) {
        let track = self
            .current_track()
            .cloned()
            .unwrap_or_else(TrackRecord::nothing);
        self.connection.now_playing.set(track.clone());
        self.connection.position_ms.set(self.position_ms);
        self.connection.playback_status.set(self.status);
        self.notifier.update(self.status, &track);
        debug!(status = ?self.status, index = ?self.current_index, "session published");
    }
}
