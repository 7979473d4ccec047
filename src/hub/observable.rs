use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

struct Shared<T> {
    value: T,
    next_id: u64,
    subscribers: Vec<(u64, Sender<T>)>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// A value with push-on-change subscribers.
///
/// A new subscriber first receives the current value, then every change in
/// the order it was made. Setting an equal value pushes nothing. Clones
/// share the same value.
pub struct Observable<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + PartialEq + Send + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                value,
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    pub fn get(&self) -> T {
        lock(&self.shared).value.clone()
    }

    /// Store `value` and push it to every subscriber. Returns whether the
    /// value changed.
    pub fn set(&self, value: T) -> bool {
        let mut shared = lock(&self.shared);
        if shared.value == value {
            return false;
        }
        shared.value = value.clone();
        // Pushes happen under the lock, so two racing `set`s never
        // interleave for any one subscriber.
        shared
            .subscribers
            .retain(|(_, tx)| tx.send(value.clone()).is_ok());
        true
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::channel();
        let mut shared = lock(&self.shared);
        let id = shared.next_id;
        shared.next_id += 1;
        let _ = tx.send(shared.value.clone());
        shared.subscribers.push((id, tx));
        Subscription {
            id,
            rx,
            owner: Arc::downgrade(&self.shared),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared).subscribers.len()
    }
}

/// Handle for one subscriber. Dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription<T> {
    id: u64,
    rx: Receiver<T>,
    owner: Weak<Mutex<Shared<T>>>,
}

impl<T> Subscription<T> {
    pub fn try_recv(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(v) => Some(v),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Every pushed value not yet received, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    /// The newest pushed value, discarding older ones.
    pub fn latest(&self) -> Option<T> {
        self.rx.try_iter().last()
    }

    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(owner) = self.owner.upgrade() {
            lock(&owner).subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}
