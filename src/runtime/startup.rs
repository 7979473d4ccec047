use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::access::{AllowList, current_uid};
use crate::browser::Browser;
use crate::config;
use crate::hub::SessionConnection;
use crate::library::json::JsonCatalogLoader;
use crate::library::scan::DirectoryLoader;
use crate::library::{CatalogLoader, MusicSource};
use crate::notification::{LogSink, Notifier};
use crate::session::{PlaybackSession, Player, SessionOptions};
use crate::store::{JsonFileStore, MemoryStore, PositionStore};

/// The wired-up pieces a runtime drives.
pub struct Services {
    pub source: Arc<MusicSource>,
    pub connection: Arc<SessionConnection>,
    pub session: PlaybackSession,
}

/// Pick the catalog loader: a directory given on the command line wins,
/// then `library.catalog_json`, then `library.music_dir`, then the current
/// directory.
pub fn catalog_loader(
    settings: &config::Settings,
    dir_override: Option<&Path>,
) -> Option<Arc<dyn CatalogLoader>> {
    let library = &settings.library;
    if let Some(dir) = dir_override {
        return Some(Arc::new(DirectoryLoader::new(dir, library.clone())));
    }
    if let Some(json) = &library.catalog_json {
        return Some(Arc::new(JsonCatalogLoader::new(json)));
    }
    let dir = library
        .music_dir
        .clone()
        .or_else(|| std::env::current_dir().ok())?;
    Some(Arc::new(DirectoryLoader::new(dir, library.clone())))
}

/// Two handles on the same saved session: one for the playback session,
/// one for the browser's recent root. Without a state directory the
/// session lives in memory only.
pub fn position_stores(
    settings: &config::Settings,
) -> (Box<dyn PositionStore>, Box<dyn PositionStore>) {
    let namespace = &settings.storage.namespace;
    match settings.state_dir() {
        Some(dir) => {
            let store = JsonFileStore::new(&dir, namespace);
            info!(path = %store.path().display(), "session store");
            (store_box(store), store_box(JsonFileStore::new(&dir, namespace)))
        }
        None => {
            warn!("no state directory, session will not survive a restart");
            let store = MemoryStore::new();
            (store_box(store.clone()), store_box(store))
        }
    }
}

fn store_box(store: impl PositionStore + 'static) -> Box<dyn PositionStore> {
    Box::new(store)
}

pub fn build(
    settings: &config::Settings,
    player: Box<dyn Player>,
    stores: (Box<dyn PositionStore>, Box<dyn PositionStore>),
) -> Services {
    let (session_store, recent_store) = stores;
    let source = Arc::new(MusicSource::new());

    let own_uid = current_uid().unwrap_or(u32::MAX);
    let authorizer = AllowList::from_settings(&settings.access, own_uid);
    let browser = Arc::new(Browser::new(
        source.clone(),
        Box::new(authorizer),
        recent_store,
        settings.access.allow_unknown_search,
    ));
    let connection = Arc::new(SessionConnection::new(browser));

    let notifier = Notifier::new(Box::new(LogSink), settings.notification.clone());
    let mut session = PlaybackSession::new(
        source.clone(),
        connection.clone(),
        player,
        session_store,
        SessionOptions::from(&settings.playback),
    )
    .with_notifier(notifier);

    if settings.playback.resume_on_start {
        match session.restore() {
            Ok(true) => {}
            Ok(false) => info!("no saved session"),
            Err(e) => warn!(error = %e, "could not restore the saved session"),
        }
    }

    Services {
        source,
        connection,
        session,
    }
}
