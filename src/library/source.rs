//! The music source: owns the loaded catalog and its readiness state.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::model::TrackRecord;
use super::search::{SearchFocus, search_tracks};

/// Produces the flat track list. Implementations do bulk I/O and are run
/// off the dispatch thread.
pub trait CatalogLoader: Send + Sync {
    fn load(&self) -> Result<Vec<TrackRecord>>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SourceState {
    Created,
    Initializing,
    Initialized,
    Error,
}

impl SourceState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SourceState::Initialized | SourceState::Error)
    }
}

type ReadyAction = Box<dyn FnOnce(bool) + Send>;

struct Inner {
    state: SourceState,
    catalog: Arc<[TrackRecord]>,
    generation: u64,
    pending: Vec<ReadyAction>,
}

pub struct MusicSource {
    inner: Mutex<Inner>,
}

impl Default for MusicSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MusicSource {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: SourceState::Created,
                catalog: Arc::from(Vec::new()),
                generation: 0,
                pending: Vec::new(),
            }),
        }
    }

    /// A source that is already initialized with `tracks`.
    pub fn from_tracks(tracks: Vec<TrackRecord>) -> Self {
        let source = Self::new();
        {
            let mut inner = source.lock();
            inner.state = SourceState::Initialized;
            inner.catalog = Arc::from(tracks);
            inner.generation = 1;
        }
        source
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> SourceState {
        self.lock().state
    }

    /// Bumped by every completed load. Anything derived from the catalog
    /// (the browse tree) is stale once this moves.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Move to `Initializing`. Only one load may run at a time; a reload from
    /// a terminal state is allowed.
    pub fn begin_load(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.state == SourceState::Initializing {
            warn!("rejected concurrent catalog load");
            return Err(Error::LoadInProgress);
        }
        inner.state = SourceState::Initializing;
        Ok(())
    }

    /// Record the outcome of a load started with [`MusicSource::begin_load`]
    /// and run every queued readiness action, in registration order, on the
    /// calling thread.
    pub fn finish_load(&self, outcome: Result<Vec<TrackRecord>>) {
        let (ok, actions) = {
            let mut inner = self.lock();
            let ok = match outcome {
                Ok(tracks) => {
                    info!(count = tracks.len(), "music source initialized");
                    inner.catalog = Arc::from(tracks);
                    inner.state = SourceState::Initialized;
                    true
                }
                Err(e) => {
                    warn!(error = %e, "music source failed to load");
                    inner.catalog = Arc::from(Vec::new());
                    inner.state = SourceState::Error;
                    false
                }
            };
            inner.generation += 1;
            (ok, std::mem::take(&mut inner.pending))
        };

        debug!(listeners = actions.len(), ok, "dispatching readiness");
        for action in actions {
            action(ok);
        }
    }

    /// Load synchronously with `loader`.
    pub fn load(&self, loader: &dyn CatalogLoader) -> Result<()> {
        self.begin_load()?;
        let outcome = loader.load();
        let err = match &outcome {
            Ok(_) => None,
            Err(Error::SourceLoad(msg)) => Some(Error::SourceLoad(msg.clone())),
            Err(e) => Some(Error::SourceLoad(e.to_string())),
        };
        self.finish_load(outcome);
        match err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run `action` once the source reaches a terminal state.
    ///
    /// Returns `true` when the action already ran (the source was ready),
    /// `false` when it was queued. The flag passed to the action is `true`
    /// for a successful load.
    pub fn when_ready<F>(&self, action: F) -> bool
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let mut inner = self.lock();
        match inner.state {
            SourceState::Created | SourceState::Initializing => {
                inner.pending.push(Box::new(action));
                false
            }
            state => {
                drop(inner);
                action(state == SourceState::Initialized);
                true
            }
        }
    }

    /// Snapshot of the catalog. Empty unless the source is initialized.
    pub fn tracks(&self) -> Arc<[TrackRecord]> {
        let inner = self.lock();
        if inner.state == SourceState::Initialized {
            inner.catalog.clone()
        } else {
            Arc::from(Vec::new())
        }
    }

    pub fn len(&self) -> usize {
        self.tracks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, id: &str) -> Option<TrackRecord> {
        self.tracks().iter().find(|t| t.id == id).cloned()
    }

    pub fn search(&self, query: &str, focus: Option<&SearchFocus>) -> Vec<TrackRecord> {
        search_tracks(&self.tracks(), query, focus)
    }
}
