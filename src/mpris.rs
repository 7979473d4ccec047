//! MPRIS (`org.mpris.MediaPlayer2`) surface on the session bus.
//!
//! Transport methods are forwarded through the [`SessionConnection`]; the
//! properties mirror its observables, and a change on either one is
//! announced with `PropertiesChanged`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_io::{Timer, block_on};
use tracing::{debug, info, warn};
use zbus::object_server::InterfaceRef;
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::hub::SessionConnection;
use crate::library::TrackRecord;
use crate::session::{PlaybackStatus, TransportCommand};

pub const BUS_NAME: &str = "org.mpris.MediaPlayer2.rondo";
const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const NO_TRACK: &str = "/org/mpris/MediaPlayer2/TrackList/NoTrack";
const URI_SCHEME: &str = "rondo";
const TRACK_URI_PREFIX: &str = "rondo:track/";
const MIRROR_POLL: Duration = Duration::from_millis(250);

pub fn status_str(status: PlaybackStatus) -> &'static str {
    match status {
        PlaybackStatus::Playing | PlaybackStatus::Preparing => "Playing",
        PlaybackStatus::Paused => "Paused",
        PlaybackStatus::Idle | PlaybackStatus::Stopped | PlaybackStatus::Error => "Stopped",
    }
}

/// D-Bus object path naming `track_id`. Characters outside `[A-Za-z0-9]`
/// are hex-escaped so distinct ids stay distinct.
pub fn track_object_path(track_id: &str) -> String {
    if track_id.is_empty() {
        return NO_TRACK.to_string();
    }
    let mut path = String::from("/org/rondo/track/t");
    for c in track_id.chars() {
        if c.is_ascii_alphanumeric() {
            path.push(c);
        } else {
            path.push_str(&format!("_{:x}_", c as u32));
        }
    }
    path
}

/// Track id carried by an `OpenUri` argument, if it is one of ours.
pub fn parse_track_uri(uri: &str) -> Option<&str> {
    uri.strip_prefix(TRACK_URI_PREFIX).filter(|id| !id.is_empty())
}

fn owned(value: Value<'_>) -> Option<OwnedValue> {
    OwnedValue::try_from(value).ok()
}

/// `Metadata` property for `track`. Empty fields are left out.
pub fn metadata_for(track: &TrackRecord) -> HashMap<String, OwnedValue> {
    let mut map = HashMap::new();

    if let Some(v) = ObjectPath::try_from(track_object_path(&track.id))
        .ok()
        .and_then(|p| owned(Value::from(p)))
    {
        map.insert("mpris:trackid".to_string(), v);
    }
    if track.is_nothing() {
        return map;
    }

    let mut text = |key: &str, value: &str| {
        if value.is_empty() {
            return;
        }
        if let Some(v) = owned(Value::from(value.to_string())) {
            map.insert(key.to_string(), v);
        }
    };
    text("xesam:title", &track.title);
    text("xesam:album", &track.album);

    if !track.artist.is_empty() {
        if let Some(v) = owned(Value::from(vec![track.artist.clone()])) {
            map.insert("xesam:artist".to_string(), v);
        }
    }
    if !track.genre.is_empty() {
        if let Some(v) = owned(Value::from(vec![track.genre.clone()])) {
            map.insert("xesam:genre".to_string(), v);
        }
    }
    if track.track_number > 0 {
        if let Some(v) = owned(Value::from(track.track_number as i32)) {
            map.insert("xesam:trackNumber".to_string(), v);
        }
    }
    if track.has_known_duration() {
        if let Some(v) = owned(Value::from(track.duration_ms.saturating_mul(1000))) {
            map.insert("mpris:length".to_string(), v);
        }
    }
    map
}

fn us_to_ms(us: i64) -> i64 {
    us / 1000
}

type QuitHook = Box<dyn Fn() + Send + Sync>;

struct RootIface {
    on_quit: QuitHook,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // Headless; nothing to raise.
    }

    fn quit(&self) {
        info!("quit requested over mpris");
        (self.on_quit)();
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "rondo"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec![URI_SCHEME.to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    connection: Arc<SessionConnection>,
}

impl PlayerIface {
    fn send(&self, cmd: TransportCommand) {
        if !self.connection.send(cmd) {
            debug!("mpris command dropped, session not connected");
        }
    }
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        self.send(TransportCommand::SkipNext);
    }

    fn previous(&self) {
        self.send(TransportCommand::SkipPrevious);
    }

    fn play(&self) {
        self.send(TransportCommand::Play);
    }

    fn pause(&self) {
        self.send(TransportCommand::Pause);
    }

    fn play_pause(&self) {
        self.send(TransportCommand::PlayPause);
    }

    fn stop(&self) {
        self.send(TransportCommand::Stop);
    }

    fn seek(&self, offset: i64) {
        self.send(TransportCommand::SeekBy(us_to_ms(offset)));
    }

    fn set_position(&self, track_id: OwnedObjectPath, position: i64) {
        // Stale requests for another track are ignored, as MPRIS asks.
        let current = self.connection.now_playing.get();
        if position < 0 || track_id.as_str() != track_object_path(&current.id) {
            return;
        }
        self.send(TransportCommand::SeekTo(us_to_ms(position) as u64));
    }

    fn open_uri(&self, uri: &str) {
        match parse_track_uri(uri) {
            Some(id) => self.send(TransportCommand::PlayFromId(id.to_string())),
            None => warn!(uri, "unsupported uri"),
        }
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        status_str(self.connection.playback_status.get())
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        metadata_for(&self.connection.now_playing.get())
    }

    #[zbus(property(emits_changed_signal = "false"))]
    fn position(&self) -> i64 {
        (self.connection.position_ms.get() as i64).saturating_mul(1000)
    }

    #[zbus(property)]
    fn rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn minimum_rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn maximum_rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        !self.connection.now_playing.get().is_nothing()
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }
}

async fn mirror(iface: InterfaceRef<PlayerIface>, connection: Arc<SessionConnection>) {
    let statuses = connection.playback_status.subscribe();
    let tracks = connection.now_playing.subscribe();

    loop {
        Timer::after(MIRROR_POLL).await;

        let emitter = iface.signal_emitter();
        let player = iface.get().await;
        if statuses.latest().is_some() {
            if let Err(e) = player.playback_status_changed(emitter).await {
                warn!(error = %e, "failed to announce playback status");
            }
        }
        if tracks.latest().is_some() {
            if let Err(e) = player.metadata_changed(emitter).await {
                warn!(error = %e, "failed to announce metadata");
            }
        }
    }
}

async fn serve(connection: Arc<SessionConnection>, on_quit: QuitHook) -> zbus::Result<()> {
    let bus = Connection::session().await?;
    bus.request_name(BUS_NAME).await?;

    let object_server = bus.object_server();
    object_server.at(OBJECT_PATH, RootIface { on_quit }).await?;
    object_server
        .at(
            OBJECT_PATH,
            PlayerIface {
                connection: connection.clone(),
            },
        )
        .await?;
    info!(name = BUS_NAME, "mpris service registered");

    let iface = object_server
        .interface::<_, PlayerIface>(OBJECT_PATH)
        .await?;
    mirror(iface, connection).await;
    Ok(())
}

/// Serve MPRIS on a background thread. `on_quit` runs when a client calls
/// `Quit`. A missing session bus is logged and otherwise ignored.
pub fn spawn_mpris<F>(connection: Arc<SessionConnection>, on_quit: F)
where
    F: Fn() + Send + Sync + 'static,
{
    let spawned = std::thread::Builder::new()
        .name("rondo-mpris".into())
        .spawn(move || {
            if let Err(e) = block_on(serve(connection, Box::new(on_quit))) {
                warn!(error = %e, "mpris unavailable");
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "failed to start mpris thread");
    }
}
