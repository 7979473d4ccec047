use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, warn};

use crate::browser::{Browser, Children};
use crate::error::Error;
use crate::library::TrackRecord;
use crate::session::{PlaybackStatus, TransportCommand};

use super::observable::Observable;

/// Where [`SessionConnection::send`] delivers commands.
pub trait CommandSink: Send {
    /// Returns `false` when the receiving end is gone.
    fn send(&self, cmd: TransportCommand) -> bool;
}

impl CommandSink for Sender<TransportCommand> {
    fn send(&self, cmd: TransportCommand) -> bool {
        Sender::send(self, cmd).is_ok()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// The one connection every surface (CLI, MPRIS, notification) reads the
/// session through. Create it once and hand the `Arc` to each consumer.
pub struct SessionConnection {
    pub connected: Observable<bool>,
    pub playback_status: Observable<PlaybackStatus>,
    /// Current track, or [`TrackRecord::nothing`].
    pub now_playing: Observable<TrackRecord>,
    /// Sticky. Set when a browse fetch finds the source failed; only
    /// [`SessionConnection::clear_network_failure`] resets it.
    pub network_failure: Observable<bool>,
    /// Last playback failure, cleared when a new track starts preparing.
    pub error: Observable<Option<String>>,
    /// Position at the last status change or seek.
    pub position_ms: Observable<u64>,
    browser: Arc<Browser>,
    commands: Mutex<Option<Box<dyn CommandSink>>>,
    nodes: Arc<Mutex<HashSet<u64>>>,
    next_node: AtomicU64,
}

impl SessionConnection {
    pub fn new(browser: Arc<Browser>) -> Self {
        Self {
            connected: Observable::new(false),
            playback_status: Observable::new(PlaybackStatus::Idle),
            now_playing: Observable::new(TrackRecord::nothing()),
            network_failure: Observable::new(false),
            error: Observable::new(None),
            position_ms: Observable::new(0),
            browser,
            commands: Mutex::new(None),
            nodes: Arc::new(Mutex::new(HashSet::new())),
            next_node: AtomicU64::new(0),
        }
    }

    pub fn browser(&self) -> &Arc<Browser> {
        &self.browser
    }

    /// Attach the command channel of a running session.
    pub fn connect(&self, sink: Box<dyn CommandSink>) {
        *lock(&self.commands) = Some(sink);
        self.connected.set(true);
        debug!("session connected");
    }

    pub fn disconnect(&self) {
        lock(&self.commands).take();
        self.connected.set(false);
        debug!("session disconnected");
    }

    /// Forward `cmd` to the session. `false` when not connected or the
    /// session has gone away.
    pub fn send(&self, cmd: TransportCommand) -> bool {
        let guard = lock(&self.commands);
        let Some(sink) = guard.as_ref() else {
            debug!(?cmd, "command dropped, not connected");
            return false;
        };
        if sink.send(cmd) {
            true
        } else {
            drop(guard);
            warn!("session command channel closed");
            self.disconnect();
            false
        }
    }

    pub fn clear_network_failure(&self) {
        self.network_failure.set(false);
    }

    /// Subscribe to the children of `node_id`.
    ///
    /// The fetch resolves once: immediately when the source is ready,
    /// otherwise when the load completes. A failed source resolves with no
    /// children and latches [`SessionConnection::network_failure`]. Nothing
    /// is delivered if the subscription was dropped first.
    pub fn subscribe(&self, node_id: &str) -> NodeSubscription {
        let key = self.next_node.fetch_add(1, Ordering::Relaxed);
        lock(&self.nodes).insert(key);

        let (tx, rx) = mpsc::channel();
        let nodes = self.nodes.clone();
        let network_failure = self.network_failure.clone();
        let node = node_id.to_string();

        self.browser.fetch_children(node_id, move |children: Children| {
            if !lock(&nodes).contains(&key) {
                debug!(node = %node, "browse result dropped, subscription gone");
                return;
            }
            let children = match children {
                Err(Error::SourceLoad(msg)) => {
                    warn!(node = %node, error = %msg, "browse fetch failed");
                    network_failure.set(true);
                    Ok(Vec::new())
                }
                other => other,
            };
            let _ = tx.send(children);
        });

        NodeSubscription {
            key,
            node_id: node_id.to_string(),
            rx,
            nodes: self.nodes.clone(),
        }
    }

    pub fn node_subscription_count(&self) -> usize {
        lock(&self.nodes).len()
    }
}

/// A browse-node subscription. Dropping it unregisters the fetch.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct NodeSubscription {
    key: u64,
    node_id: String,
    rx: Receiver<Children>,
    nodes: Arc<Mutex<HashSet<u64>>>,
}

impl NodeSubscription {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn try_recv(&self) -> Option<Children> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Children> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for NodeSubscription {
    fn drop(&mut self) {
        lock(&self.nodes).remove(&self.key);
    }
}
