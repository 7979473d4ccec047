use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use super::*;
use crate::access::AllowList;
use crate::browser::Browser;
use crate::error::Error;
use crate::library::browse::{BROWSABLE_ROOT, RECOMMENDED_ROOT};
use crate::library::tests::track;
use crate::library::{BrowseEntry, MusicSource, TrackRecord};
use crate::session::{PlaybackStatus, TransportCommand};
use crate::store::MemoryStore;

fn connection(source: MusicSource) -> SessionConnection {
    let browser = Browser::new(
        Arc::new(source),
        Box::new(AllowList::new(0, Vec::new())),
        Box::new(MemoryStore::new()),
        true,
    );
    SessionConnection::new(Arc::new(browser))
}

fn catalog() -> Vec<TrackRecord> {
    vec![
        track("1", "Song One", "Alpha", "X", 1),
        track("2", "Song Two", "Alpha", "X", 2),
    ]
}

#[test]
fn new_subscriber_gets_last_value_then_changes_in_order() {
    let status = Observable::new(PlaybackStatus::Idle);
    status.set(PlaybackStatus::Preparing);

    let sub = status.subscribe();
    status.set(PlaybackStatus::Playing);
    status.set(PlaybackStatus::Paused);

    assert_eq!(
        sub.drain(),
        vec![
            PlaybackStatus::Preparing,
            PlaybackStatus::Playing,
            PlaybackStatus::Paused
        ]
    );
}

#[test]
fn setting_an_equal_value_pushes_nothing() {
    let flag = Observable::new(false);
    let sub = flag.subscribe();
    assert_eq!(sub.try_recv(), Some(false));
    assert!(!flag.set(false));
    assert!(sub.try_recv().is_none());
    assert!(flag.set(true));
    assert_eq!(sub.try_recv(), Some(true));
}

#[test]
fn dropped_subscription_stops_receiving() {
    let value = Observable::new(0u64);
    let a = value.subscribe();
    let b = value.subscribe();
    assert_eq!(value.subscriber_count(), 2);

    drop(b);
    assert_eq!(value.subscriber_count(), 1);
    value.set(7);
    assert_eq!(a.latest(), Some(7));

    a.unsubscribe();
    assert_eq!(value.subscriber_count(), 0);
}

#[test]
fn pushes_from_many_threads_arrive_in_set_order() {
    let value = Observable::new(0u64);
    let sub = value.subscribe();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let value = value.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let next = value.get() + 1;
                    value.set(next);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let seen = sub.drain();
    assert_eq!(seen.last().copied(), Some(value.get()));
    // Each subscriber sees a sequence of distinct consecutive values.
    assert!(seen.windows(2).all(|w| w[0] != w[1]));
}

#[test]
fn nothing_playing_is_the_initial_now_playing() {
    let conn = connection(MusicSource::new());
    let sub = conn.now_playing.subscribe();
    assert!(sub.try_recv().unwrap().is_nothing());
    assert_eq!(conn.playback_status.get(), PlaybackStatus::Idle);
    assert!(!conn.connected.get());
}

#[test]
fn send_fails_until_connected() {
    let conn = connection(MusicSource::new());
    assert!(!conn.send(TransportCommand::Play));

    let (tx, rx) = mpsc::channel::<TransportCommand>();
    conn.connect(Box::new(tx));
    assert!(conn.connected.get());
    assert!(conn.send(TransportCommand::SkipNext));
    assert_eq!(rx.try_recv().unwrap(), TransportCommand::SkipNext);

    drop(rx);
    assert!(!conn.send(TransportCommand::Play));
    assert!(!conn.connected.get());
}

#[test]
fn node_subscription_resolves_once_when_source_becomes_ready() {
    let conn = connection(MusicSource::new());
    let sub = conn.subscribe(RECOMMENDED_ROOT);
    assert!(sub.try_recv().is_none());
    assert_eq!(conn.node_subscription_count(), 1);

    let source = conn.browser().source().clone();
    source.begin_load().unwrap();
    source.finish_load(Ok(catalog()));

    let children = sub.try_recv().unwrap().unwrap();
    assert_eq!(children.iter().map(BrowseEntry::id).collect::<Vec<_>>(), vec!["1"]);

    source.begin_load().unwrap();
    source.finish_load(Ok(catalog()));
    assert!(sub.try_recv().is_none());
}

#[test]
fn node_subscription_on_ready_source_resolves_immediately() {
    let conn = connection(MusicSource::from_tracks(catalog()));
    let sub = conn.subscribe(BROWSABLE_ROOT);
    assert_eq!(sub.node_id(), BROWSABLE_ROOT);
    assert_eq!(sub.try_recv().unwrap().unwrap().len(), 2);
}

#[test]
fn dropped_node_subscription_gets_no_push() {
    let conn = connection(MusicSource::new());
    let sub = conn.subscribe(BROWSABLE_ROOT);
    drop(sub);
    assert_eq!(conn.node_subscription_count(), 0);

    let source = conn.browser().source().clone();
    source.begin_load().unwrap();
    source.finish_load(Ok(catalog()));
    assert_eq!(conn.node_subscription_count(), 0);
}

#[test]
fn failed_source_latches_network_failure_until_cleared() {
    let conn = connection(MusicSource::new());
    let sub = conn.subscribe(BROWSABLE_ROOT);

    let source = conn.browser().source().clone();
    source.begin_load().unwrap();
    source.finish_load(Err(Error::SourceLoad("offline".into())));

    assert!(sub.try_recv().unwrap().unwrap().is_empty());
    assert!(conn.network_failure.get());

    // A successful reload does not clear the latch by itself.
    source.begin_load().unwrap();
    source.finish_load(Ok(catalog()));
    let _again = conn.subscribe(BROWSABLE_ROOT);
    assert!(conn.network_failure.get());

    conn.clear_network_failure();
    assert!(!conn.network_failure.get());
}

#[test]
fn missing_node_resolves_with_not_found() {
    let conn = connection(MusicSource::from_tracks(catalog()));
    let sub = conn.subscribe("nope");
    assert!(matches!(sub.try_recv().unwrap(), Err(Error::NotFound(_))));
    assert!(!conn.network_failure.get());
}
