//! Observable Set Module
//!
//! Thread-safe set with concurrent reads, serialized writes, and push
//! notification of every observer after each membership change.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::dispatch::{spawn_dispatcher, Dispatch, Observer, Registry};
use super::ObserverId;

#[derive(Debug)]
struct Members<T> {
    set: HashSet<T>,
    /// Bumped on every membership change
    version: u64,
}

// == Observable Set ==
/// Set of identifiers that notifies observers on every change.
///
/// Reads share a lock; writes take it exclusively and, before releasing it,
/// enqueue the new snapshot for a single dispatcher task. Observers therefore
/// see changes in one global order, and no set lock is held while their
/// callbacks run, so callbacks may freely read, mutate, subscribe or
/// unsubscribe.
pub struct ObservableSet<T> {
    members: RwLock<Members<T>>,
    observers: Registry<T>,
    next_observer: AtomicU64,
    dispatch: mpsc::UnboundedSender<Dispatch<T>>,
}

impl<T> ObservableSet<T>
where
    T: Eq + Hash + Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an empty set and spawns its dispatcher.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime.
    pub fn new() -> Self {
        Self::with_members(std::iter::empty())
    }

    /// Creates a set seeded with `members`. Seeding notifies nobody.
    pub fn with_members(members: impl IntoIterator<Item = T>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let observers: Registry<T> = Arc::new(RwLock::new(HashMap::new()));
        // The task ends by itself once `tx` is dropped.
        spawn_dispatcher(rx, Arc::clone(&observers));

        Self {
            members: RwLock::new(Members {
                set: members.into_iter().collect(),
                version: 0,
            }),
            observers,
            next_observer: AtomicU64::new(1),
            dispatch: tx,
        }
    }

    // == Reads ==
    pub fn contains(&self, id: &T) -> bool {
        self.members.read().set.contains(id)
    }

    pub fn count(&self) -> usize {
        self.members.read().set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().set.is_empty()
    }

    /// Copy of the current members.
    pub fn snapshot(&self) -> HashSet<T> {
        self.members.read().set.clone()
    }

    // == Toggle ==
    /// Flips membership of `id` and returns whether it is now a member.
    pub fn toggle(&self, id: T) -> bool {
        let mut members = self.members.write();
        let now_member = if members.set.remove(&id) {
            false
        } else {
            members.set.insert(id);
            true
        };
        self.publish(&mut members);
        now_member
    }

    // == Remove ==
    /// Removes `id` if present. Returns false, notifying nobody, otherwise.
    pub fn remove(&self, id: &T) -> bool {
        let mut members = self.members.write();
        if !members.set.remove(id) {
            return false;
        }
        self.publish(&mut members);
        true
    }

    // == Subscribe ==
    /// Registers `callback` and immediately calls it, on this thread, with
    /// the current members.
    ///
    /// Afterwards it receives exactly one call per membership change made
    /// after that snapshot, from the dispatcher task. The initial call always
    /// comes first.
    pub fn subscribe<F>(&self, callback: F) -> ObserverId
    where
        F: FnMut(&HashSet<T>) + Send + 'static,
    {
        let id = self.next_observer.fetch_add(1, Ordering::Relaxed);

        let members = self.members.read();
        let observer = Arc::new(Observer::new(members.version, Box::new(callback)));
        // Held until the initial call returns, so the dispatcher cannot
        // reach this observer first.
        let mut callback = observer.callback.lock();
        self.observers.write().insert(id, Arc::clone(&observer));
        let initial = members.set.clone();
        drop(members);

        debug!(observer = id, since = observer.since, "observer subscribed");
        (*callback)(&initial);
        id
    }

    // == Unsubscribe ==
    /// Removes an observer. Returns false if it was not registered.
    ///
    /// A delivery already under way to this observer may still finish, but
    /// no later one starts.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let removed = self.observers.write().remove(&id);
        match removed {
            Some(observer) => {
                observer.active.store(false, Ordering::Release);
                debug!(observer = id, "observer unsubscribed");
                true
            }
            None => false,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    // == Flushed ==
    /// Resolves once every notification enqueued before the call has been
    /// delivered. Must not be awaited from inside an observer callback.
    pub async fn flushed(&self) {
        let (done, delivered) = oneshot::channel();
        if self.dispatch.send(Dispatch::Flush(done)).is_ok() {
            let _ = delivered.await;
        }
    }

    /// Enqueues the post-change snapshot. Called with the write lock held,
    /// so queue order is mutation order.
    fn publish(&self, members: &mut Members<T>) {
        members.version += 1;
        let message = Dispatch::Changed {
            version: members.version,
            snapshot: Arc::new(members.set.clone()),
        };
        if self.dispatch.send(message).is_err() {
            warn!(version = members.version, "dispatcher stopped, notification dropped");
        }
    }
}

impl<T> Default for ObservableSet<T>
where
    T: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
