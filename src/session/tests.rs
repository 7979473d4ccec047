use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::*;
use crate::access::AllowList;
use crate::browser::Browser;
use crate::error::Error;
use crate::hub::{SessionConnection, Subscription};
use crate::library::browse::album_node_id;
use crate::library::tests::track;
use crate::library::{MusicSource, SearchFocus, TrackRecord};
use crate::store::{MemoryStore, PositionStore, SavedSession};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Prepare(u64, String),
    Start,
    Pause,
    Seek(u64),
    Stop,
    Release,
    Volume(f32),
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    position_ms: u64,
    reject_prepare: bool,
}

/// Records every call; events are delivered by the test.
#[derive(Clone, Default)]
struct FakePlayer(Arc<Mutex<FakeState>>);

impl FakePlayer {
    fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().calls.clone()
    }

    fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    fn last_prepare(&self) -> Option<String> {
        self.calls().into_iter().rev().find_map(|c| match c {
            Call::Prepare(_, locator) => Some(locator),
            _ => None,
        })
    }

    fn advance(&self, ms: u64) {
        self.0.lock().unwrap().position_ms += ms;
    }

    fn clear(&self) {
        self.0.lock().unwrap().calls.clear();
    }
}

impl Player for FakePlayer {
    fn prepare(&mut self, generation: u64, locator: &str) -> crate::error::Result<()> {
        let mut s = self.0.lock().unwrap();
        if s.reject_prepare {
            return Err(Error::Playback("no decoder".into()));
        }
        s.calls.push(Call::Prepare(generation, locator.to_string()));
        s.position_ms = 0;
        Ok(())
    }

    fn start(&mut self) {
        self.0.lock().unwrap().calls.push(Call::Start);
    }

    fn pause(&mut self) {
        self.0.lock().unwrap().calls.push(Call::Pause);
    }

    fn seek_to(&mut self, position_ms: u64) {
        let mut s = self.0.lock().unwrap();
        s.calls.push(Call::Seek(position_ms));
        s.position_ms = position_ms;
    }

    fn stop(&mut self) {
        self.0.lock().unwrap().calls.push(Call::Stop);
    }

    fn release(&mut self) {
        self.0.lock().unwrap().calls.push(Call::Release);
    }

    fn set_volume(&mut self, volume: f32) {
        self.0.lock().unwrap().calls.push(Call::Volume(volume));
    }

    fn position_ms(&self) -> u64 {
        self.0.lock().unwrap().position_ms
    }
}

struct Harness {
    session: PlaybackSession,
    player: FakePlayer,
    store: MemoryStore,
    conn: Arc<SessionConnection>,
    statuses: Subscription<PlaybackStatus>,
}

impl Harness {
    fn new(catalog: Vec<TrackRecord>) -> Self {
        Self::with(catalog, MemoryStore::new(), SessionOptions::default())
    }

    fn with(catalog: Vec<TrackRecord>, store: MemoryStore, options: SessionOptions) -> Self {
        let source = Arc::new(MusicSource::from_tracks(catalog));
        let browser = Browser::new(
            source.clone(),
            Box::new(AllowList::new(0, Vec::new())),
            Box::new(store.clone()),
            true,
        );
        let conn = Arc::new(SessionConnection::new(Arc::new(browser)));
        let player = FakePlayer::default();
        let session = PlaybackSession::new(
            source,
            conn.clone(),
            Box::new(player.clone()),
            Box::new(store.clone()),
            options,
        );
        let statuses = conn.playback_status.subscribe();
        Self {
            session,
            player,
            store,
            conn,
            statuses,
        }
    }

    fn prepared(&mut self) {
        let generation = self.session.generation();
        self.session.on_player_event(PlayerEvent::prepared(generation));
    }

    fn completed(&mut self) {
        let generation = self.session.generation();
        self.session.on_player_event(PlayerEvent::completed(generation));
    }

    fn play(&mut self, id: &str) {
        self.session.play_from_id(id).unwrap();
        self.prepared();
    }

    fn current_id(&self) -> Option<&str> {
        self.session.current_track().map(|t| t.id.as_str())
    }
}

fn scenario() -> Vec<TrackRecord> {
    vec![
        track("1", "Song One", "Alpha", "X", 1),
        track("2", "Song Two", "Alpha", "X", 2),
    ]
}

fn three() -> Vec<TrackRecord> {
    vec![
        track("a", "A", "Alpha", "X", 1),
        track("b", "B", "Alpha", "X", 2),
        track("c", "C", "Alpha", "X", 3),
    ]
}

#[test]
fn play_from_id_goes_through_preparing_to_playing() {
    let mut h = Harness::new(scenario());
    h.session.play_from_id("2").unwrap();
    assert_eq!(h.session.status(), PlaybackStatus::Preparing);
    assert_eq!(h.session.current_index(), Some(1));
    assert_eq!(h.conn.now_playing.get().id, "2");

    h.prepared();
    assert_eq!(
        h.statuses.drain(),
        vec![
            PlaybackStatus::Idle,
            PlaybackStatus::Preparing,
            PlaybackStatus::Playing
        ]
    );
    assert_eq!(h.player.last_prepare().as_deref(), Some("/music/2.mp3"));

    h.session.skip_next().unwrap();
    assert_eq!(h.current_id(), Some("1"));
    assert_eq!(h.session.current_index(), Some(0));
}

#[test]
fn unknown_id_is_not_found_and_changes_nothing() {
    let mut h = Harness::new(scenario());
    let err = h.session.play_from_id("nope").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(h.session.status(), PlaybackStatus::Idle);
    assert!(h.player.calls().is_empty());
    assert_eq!(h.statuses.drain(), vec![PlaybackStatus::Idle]);
}

#[test]
fn album_media_id_plays_within_the_album() {
    let mut catalog = scenario();
    catalog.insert(0, track("0", "Other", "Beta", "Y", 1));
    let mut h = Harness::new(catalog);

    h.session
        .play_from_id(&format!("{}|2", album_node_id("Alpha")))
        .unwrap();
    let ids: Vec<&str> = h.session.playlist().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(h.session.current_index(), Some(1));
}

#[test]
fn pause_then_play_keeps_position() {
    let mut h = Harness::new(scenario());
    h.play("1");
    h.player.advance(42_000);

    h.session.pause().unwrap();
    assert_eq!(h.session.status(), PlaybackStatus::Paused);
    assert_eq!(h.session.position_ms(), 42_000);

    h.session.play().unwrap();
    assert_eq!(h.session.status(), PlaybackStatus::Playing);
    assert_eq!(h.session.position_ms(), 42_000);
    assert_eq!(h.player.count(&Call::Start), 2);
}

#[test]
fn pause_is_a_no_op_unless_playing() {
    let mut h = Harness::new(scenario());
    h.session.pause().unwrap();
    assert_eq!(h.session.status(), PlaybackStatus::Idle);
    assert!(h.player.calls().is_empty());
}

#[test]
fn skipping_wraps_both_ways() {
    let mut h = Harness::new(three());
    h.play("c");
    h.session.skip_next().unwrap();
    assert_eq!(h.session.current_index(), Some(0));
    h.prepared();

    h.session.skip_previous().unwrap();
    assert_eq!(h.session.current_index(), Some(2));
    assert_eq!(h.player.last_prepare().as_deref(), Some("/music/c.mp3"));
}

#[test]
fn skip_index_is_persisted() {
    let mut h = Harness::new(three());
    h.play("a");
    assert_eq!(h.store.snapshot().index, Some(0));
    assert_eq!(h.store.snapshot().playlist.len(), 3);

    h.session.skip_next().unwrap();
    assert_eq!(h.store.snapshot().index, Some(1));
}

#[test]
fn preparing_rejects_everything_but_stop() {
    let mut h = Harness::new(scenario());
    h.session.play_from_id("1").unwrap();

    assert!(matches!(h.session.play(), Err(Error::Busy)));
    assert!(matches!(h.session.pause(), Err(Error::Busy)));
    assert!(matches!(h.session.skip_next(), Err(Error::Busy)));
    assert!(matches!(h.session.seek_to(10), Err(Error::Busy)));
    assert!(matches!(h.session.play_from_id("2"), Err(Error::Busy)));
    assert_eq!(h.session.status(), PlaybackStatus::Preparing);

    let stale = h.session.generation();
    h.session.stop();
    assert_eq!(h.session.status(), PlaybackStatus::Stopped);

    // The cancelled prepare completing late changes nothing.
    h.session.on_player_event(PlayerEvent::prepared(stale));
    assert_eq!(h.session.status(), PlaybackStatus::Stopped);
    assert_eq!(h.player.count(&Call::Start), 0);
}

#[test]
fn stop_releases_once_and_clears_position() {
    let mut h = Harness::new(scenario());
    h.play("1");
    h.player.advance(5_000);
    h.session.pause().unwrap();

    h.session.stop();
    h.session.stop();
    assert_eq!(h.session.status(), PlaybackStatus::Stopped);
    assert_eq!(h.session.position_ms(), 0);
    assert_eq!(h.player.count(&Call::Release), 1);
}

#[test]
fn play_after_stop_restarts_current_track() {
    let mut h = Harness::new(scenario());
    h.play("2");
    h.session.stop();
    h.player.clear();

    h.session.play().unwrap();
    assert_eq!(h.session.status(), PlaybackStatus::Preparing);
    assert_eq!(h.player.last_prepare().as_deref(), Some("/music/2.mp3"));
}

#[test]
fn play_from_idle_resumes_stored_playlist() {
    let store = MemoryStore::with(SavedSession {
        playlist: three(),
        index: Some(1),
    });
    let mut h = Harness::with(Vec::new(), store, SessionOptions::default());

    h.session.play().unwrap();
    assert_eq!(h.current_id(), Some("b"));
    h.prepared();
    assert_eq!(h.session.status(), PlaybackStatus::Playing);
}

#[test]
fn play_with_nothing_stored_is_nothing_to_play() {
    let mut h = Harness::new(scenario());
    assert!(matches!(h.session.play(), Err(Error::NothingToPlay)));
    assert!(matches!(h.session.skip_next(), Err(Error::NothingToPlay)));
}

#[test]
fn restore_publishes_now_playing_without_playing() {
    let store = MemoryStore::with(SavedSession {
        playlist: three(),
        index: Some(2),
    });
    let mut h = Harness::with(three(), store, SessionOptions::default());
    assert!(h.session.restore().unwrap());
    assert_eq!(h.session.status(), PlaybackStatus::Idle);
    assert_eq!(h.conn.now_playing.get().id, "c");
    assert!(h.player.calls().is_empty());
}

#[test]
fn call_pauses_and_hangup_resumes() {
    let mut h = Harness::new(scenario());
    h.play("1");

    h.session.on_call_state(CallState::Ringing);
    assert_eq!(h.session.status(), PlaybackStatus::Paused);
    h.session.on_call_state(CallState::OffHook);
    assert_eq!(h.session.status(), PlaybackStatus::Paused);

    h.session.on_call_state(CallState::Idle);
    assert_eq!(h.session.status(), PlaybackStatus::Playing);
}

#[test]
fn user_pause_during_call_is_not_undone_by_hangup() {
    let mut h = Harness::new(scenario());
    h.play("1");
    h.session.on_call_state(CallState::Ringing);
    h.session.pause().unwrap();

    h.session.on_call_state(CallState::Idle);
    assert_eq!(h.session.status(), PlaybackStatus::Paused);
}

#[test]
fn call_while_paused_by_user_does_not_resume() {
    let mut h = Harness::new(scenario());
    h.play("1");
    h.session.pause().unwrap();
    h.session.on_call_state(CallState::Ringing);
    h.session.on_call_state(CallState::Idle);
    assert_eq!(h.session.status(), PlaybackStatus::Paused);
}

#[test]
fn call_during_prepare_lands_in_paused() {
    let mut h = Harness::new(scenario());
    h.session.play_from_id("1").unwrap();
    h.session.on_call_state(CallState::Ringing);
    h.prepared();
    assert_eq!(h.session.status(), PlaybackStatus::Paused);
    assert_eq!(h.player.count(&Call::Start), 0);

    h.session.on_call_state(CallState::Idle);
    assert_eq!(h.session.status(), PlaybackStatus::Playing);
}

#[test]
fn transient_focus_loss_pauses_and_regain_resumes() {
    let mut h = Harness::new(scenario());
    h.play("1");
    h.session.on_audio_focus(FocusChange::LossTransient);
    assert_eq!(h.session.status(), PlaybackStatus::Paused);
    assert_eq!(h.player.count(&Call::Release), 0);

    h.session.on_audio_focus(FocusChange::Gain);
    assert_eq!(h.session.status(), PlaybackStatus::Playing);
}

#[test]
fn regain_waits_for_call_to_end() {
    let mut h = Harness::new(scenario());
    h.play("1");
    h.session.on_audio_focus(FocusChange::LossTransient);
    h.session.on_call_state(CallState::Ringing);

    h.session.on_audio_focus(FocusChange::Gain);
    assert_eq!(h.session.status(), PlaybackStatus::Paused);
    h.session.on_call_state(CallState::Idle);
    assert_eq!(h.session.status(), PlaybackStatus::Playing);
}

#[test]
fn hangup_waits_for_focus_lost_during_call() {
    let mut h = Harness::new(scenario());
    h.play("1");
    h.session.on_call_state(CallState::Ringing);
    h.session.on_audio_focus(FocusChange::LossTransient);

    h.session.on_call_state(CallState::Idle);
    assert_eq!(h.session.status(), PlaybackStatus::Paused);
    h.session.on_audio_focus(FocusChange::Gain);
    assert_eq!(h.session.status(), PlaybackStatus::Playing);
}

#[test]
fn permanent_focus_loss_stops_and_needs_explicit_replay() {
    let mut h = Harness::new(scenario());
    h.play("1");
    h.session.on_audio_focus(FocusChange::Loss);
    assert_eq!(h.session.status(), PlaybackStatus::Stopped);
    assert_eq!(h.player.count(&Call::Release), 1);

    h.session.on_audio_focus(FocusChange::Gain);
    assert_eq!(h.session.status(), PlaybackStatus::Stopped);
}

#[test]
fn ducking_lowers_volume_without_state_change() {
    let options = SessionOptions {
        duck_volume: 0.25,
        ..SessionOptions::default()
    };
    let mut h = Harness::with(scenario(), MemoryStore::new(), options);
    h.play("1");
    h.statuses.drain();

    h.session.on_audio_focus(FocusChange::LossTransientCanDuck);
    assert_eq!(h.session.status(), PlaybackStatus::Playing);
    assert_eq!(h.player.calls().last(), Some(&Call::Volume(0.25)));

    h.session.on_audio_focus(FocusChange::Gain);
    assert_eq!(h.player.calls().last(), Some(&Call::Volume(1.0)));
    assert!(h.statuses.drain().is_empty());
}

#[test]
fn becoming_noisy_pauses_for_good() {
    let mut h = Harness::new(scenario());
    h.play("1");
    h.session.on_call_state(CallState::Ringing);
    h.session.on_becoming_noisy();
    h.session.on_call_state(CallState::Idle);
    assert_eq!(h.session.status(), PlaybackStatus::Paused);
}

#[test]
fn player_failure_enters_error_and_releases() {
    let mut h = Harness::new(scenario());
    h.play("1");
    let generation = h.session.generation();
    h.session
        .on_player_event(PlayerEvent::failed(generation, "decode error"));

    assert_eq!(h.session.status(), PlaybackStatus::Error);
    assert_eq!(h.conn.error.get().as_deref(), Some("decode error"));
    assert_eq!(h.player.count(&Call::Release), 1);

    // A new track clears the error.
    h.session.play_from_id("2").unwrap();
    assert_eq!(h.conn.error.get(), None);
}

#[test]
fn rejected_prepare_is_a_playback_error() {
    let mut h = Harness::new(scenario());
    h.player.0.lock().unwrap().reject_prepare = true;
    assert!(matches!(h.session.play_from_id("1"), Err(Error::Playback(_))));
    assert_eq!(h.session.status(), PlaybackStatus::Error);
}

#[test]
fn prepare_timeout_fails_the_track() {
    let options = SessionOptions {
        prepare_timeout: Some(Duration::from_millis(100)),
        ..SessionOptions::default()
    };
    let mut h = Harness::with(scenario(), MemoryStore::new(), options);
    h.session.play_from_id("1").unwrap();

    assert!(!h.session.check_prepare_timeout(Instant::now()));
    assert!(
        h.session
            .check_prepare_timeout(Instant::now() + Duration::from_secs(1))
    );
    assert_eq!(h.session.status(), PlaybackStatus::Error);
}

#[test]
fn no_timeout_means_preparing_indefinitely() {
    let mut h = Harness::new(scenario());
    h.session.play_from_id("1").unwrap();
    assert!(
        !h.session
            .check_prepare_timeout(Instant::now() + Duration::from_secs(3600))
    );
    assert_eq!(h.session.status(), PlaybackStatus::Preparing);
}

#[test]
fn completion_follows_repeat_mode() {
    // All: wraps.
    let mut h = Harness::new(scenario());
    h.play("2");
    h.completed();
    assert_eq!(h.current_id(), Some("1"));
    assert_eq!(h.session.status(), PlaybackStatus::Preparing);

    // Off: stops after the last track.
    let options = SessionOptions {
        repeat: RepeatMode::Off,
        ..SessionOptions::default()
    };
    let mut h = Harness::with(scenario(), MemoryStore::new(), options);
    h.play("1");
    h.completed();
    assert_eq!(h.current_id(), Some("2"));
    h.prepared();
    h.completed();
    assert_eq!(h.session.status(), PlaybackStatus::Stopped);

    // One: replays.
    let options = SessionOptions {
        repeat: RepeatMode::One,
        ..SessionOptions::default()
    };
    let mut h = Harness::with(scenario(), MemoryStore::new(), options);
    h.play("1");
    h.completed();
    assert_eq!(h.current_id(), Some("1"));
    assert_eq!(h.player.count(&Call::Prepare(2, "/music/1.mp3".into())), 1);
}

#[test]
fn seek_clamps_to_duration() {
    let mut h = Harness::new(scenario());
    h.play("1");
    h.session.seek_to(999_999).unwrap();
    assert_eq!(h.player.calls().last(), Some(&Call::Seek(180_000)));

    h.session.handle(TransportCommand::SeekTo(10_000)).unwrap();
    h.session.handle(TransportCommand::SeekBy(-60_000)).unwrap();
    assert_eq!(h.player.calls().last(), Some(&Call::Seek(0)));
}

#[test]
fn search_with_artist_focus_builds_playlist() {
    let mut catalog = scenario();
    catalog.push(track("3", "Song Three", "Beta", "Artist A", 1));
    let mut h = Harness::new(catalog);

    h.session
        .handle(TransportCommand::PlayFromSearch {
            query: "song".into(),
            focus: Some(SearchFocus::Artist {
                artist: "Artist A".into(),
            }),
        })
        .unwrap();
    assert_eq!(h.session.playlist().len(), 1);
    assert_eq!(h.current_id(), Some("3"));

    h.prepared();
    assert!(matches!(
        h.session.play_from_search("zzz", None),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn play_pause_toggles() {
    let mut h = Harness::new(scenario());
    h.play("1");
    h.session.handle(TransportCommand::PlayPause).unwrap();
    assert_eq!(h.session.status(), PlaybackStatus::Paused);
    h.session.handle(TransportCommand::PlayPause).unwrap();
    assert_eq!(h.session.status(), PlaybackStatus::Playing);
}

#[test]
fn notification_follows_session() {
    let mut h = Harness::new(scenario());
    h.play("1");
    assert_eq!(h.session.notifier().current().unwrap().track_id, "1");
    h.session.stop();
    assert!(h.session.notifier().current().is_none());
    // Stopping keeps the selection around for a later play.
    assert_eq!(h.conn.now_playing.get().id, "1");
    assert!(h.store.load().unwrap().current().is_some());
}
