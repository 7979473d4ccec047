//! Browse query surface: `get_root`, `get_children` and `search`.
//!
//! The browse tree is built lazily from the music source the first time a
//! node is fetched after a load, and rebuilt when the source reloads.

use std::sync::{Arc, Mutex, mpsc};

use tracing::{debug, info, warn};

use crate::access::CallerAuthorizer;
use crate::error::{Error, Result};
use crate::library::browse::{BROWSABLE_ROOT, EMPTY_ROOT, RECENT_ROOT};
use crate::library::{BrowseEntry, BrowseTree, MusicSource, SearchFocus, TrackRecord};
use crate::store::PositionStore;

/// What a caller gets back from [`Browser::get_root`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserRoot {
    pub id: String,
    pub search_supported: bool,
}

/// Hints a caller passes when asking for the root.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootHints {
    /// Ask for the "recent" root (resume surfaces) instead of the full tree.
    pub recent: bool,
}

/// Result of a node fetch.
pub type Children = Result<Vec<BrowseEntry>>;

struct CachedTree {
    generation: u64,
    recent: Option<String>,
    tree: Arc<BrowseTree>,
}

pub struct Browser {
    source: Arc<MusicSource>,
    authorizer: Box<dyn CallerAuthorizer>,
    recent: Mutex<Box<dyn PositionStore>>,
    allow_unknown_search: bool,
    tree: Mutex<Option<CachedTree>>,
}

impl Browser {
    pub fn new(
        source: Arc<MusicSource>,
        authorizer: Box<dyn CallerAuthorizer>,
        recent: Box<dyn PositionStore>,
        allow_unknown_search: bool,
    ) -> Self {
        Self {
            source,
            authorizer,
            recent: Mutex::new(recent),
            allow_unknown_search,
            tree: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &Arc<MusicSource> {
        &self.source
    }

    /// Root for `package`/`uid`. Unknown callers get [`EMPTY_ROOT`], which
    /// still lets them send transport commands.
    pub fn get_root(&self, package: &str, uid: u32, hints: RootHints) -> BrowserRoot {
        let known = self.authorizer.is_known_caller(package, uid);
        let search_supported = known || self.allow_unknown_search;

        let id = if !known {
            info!(package, uid, "browse denied, handing out empty root");
            EMPTY_ROOT
        } else if hints.recent {
            RECENT_ROOT
        } else {
            BROWSABLE_ROOT
        };

        BrowserRoot {
            id: id.to_string(),
            search_supported,
        }
    }

    /// The last played track, as remembered by the position store.
    pub fn recent_track(&self) -> Option<TrackRecord> {
        let store = self.recent.lock().unwrap_or_else(|e| e.into_inner());
        match store.load() {
            Ok(saved) => saved.current().cloned(),
            Err(e) => {
                warn!(error = %e, "could not read recent track");
                None
            }
        }
    }

    /// Tree for the current catalog. Rebuilt when the source has reloaded or
    /// the recent track has changed since the last build.
    pub fn tree(&self) -> Arc<BrowseTree> {
        let generation = self.source.generation();
        let recent = self.recent_track().map(|t| t.id);
        let mut slot = self.tree.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = slot.as_ref() {
            if cached.generation == generation && cached.recent == recent {
                return cached.tree.clone();
            }
        }

        let tree = Arc::new(BrowseTree::from_source(&self.source, recent.as_deref()));
        debug!(generation, recent = ?recent, "browse tree rebuilt");
        *slot = Some(CachedTree {
            generation,
            recent,
            tree: tree.clone(),
        });
        tree
    }

    /// Resolve the children of `node_id` and hand them to `done`.
    ///
    /// [`RECENT_ROOT`] is answered from the position store right away.
    /// Everything else waits for the source; `done` runs exactly once, on
    /// the thread that completes the load if the source is not ready yet.
    /// A failed source resolves with [`Error::SourceLoad`].
    ///
    /// Returns `true` when `done` already ran.
    pub fn fetch_children<F>(self: &Arc<Self>, node_id: &str, done: F) -> bool
    where
        F: FnOnce(Children) + Send + 'static,
    {
        if node_id == RECENT_ROOT {
            let children = self
                .recent_track()
                .map(BrowseEntry::Track)
                .into_iter()
                .collect();
            done(Ok(children));
            return true;
        }

        let this = Arc::clone(self);
        let node = node_id.to_string();
        self.source.when_ready(move |ok| {
            if !ok {
                done(Err(Error::SourceLoad("catalog unavailable".to_string())));
                return;
            }
            match this.tree().get(&node) {
                Some(children) => done(Ok(children.to_vec())),
                None => done(Err(Error::NotFound(node))),
            }
        })
    }

    /// Blocking variant of [`Browser::fetch_children`] for callers that are
    /// not on the dispatch thread. Returns `None` if the source has not
    /// finished loading.
    pub fn try_get_children(self: &Arc<Self>, node_id: &str) -> Option<Children> {
        let (tx, rx) = mpsc::channel();
        if self.fetch_children(node_id, move |c| {
            let _ = tx.send(c);
        }) {
            rx.try_recv().ok()
        } else {
            None
        }
    }

    /// Search on behalf of `package`/`uid`. Callers that may not search get
    /// nothing back.
    pub fn search(
        &self,
        package: &str,
        uid: u32,
        query: &str,
        focus: Option<&SearchFocus>,
    ) -> Vec<TrackRecord> {
        if !self.allow_unknown_search && !self.authorizer.is_known_caller(package, uid) {
            info!(package, uid, "search denied");
            return Vec::new();
        }
        self.source.search(query, focus)
    }
}
