//! Notification Dispatcher
//!
//! Background task delivering set snapshots to observers, one mutation at a
//! time, in the order the mutations were applied.

use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::ObserverId;

pub(crate) type Callback<T> = Box<dyn FnMut(&HashSet<T>) + Send>;
pub(crate) type Registry<T> = Arc<RwLock<HashMap<ObserverId, Arc<Observer<T>>>>>;

// == Observer ==
pub(crate) struct Observer<T> {
    /// Set version current at subscription; only later versions are delivered
    pub(crate) since: u64,
    pub(crate) active: AtomicBool,
    pub(crate) callback: Mutex<Callback<T>>,
}

impl<T> Observer<T> {
    pub(crate) fn new(since: u64, callback: Callback<T>) -> Self {
        Self {
            since,
            active: AtomicBool::new(true),
            callback: Mutex::new(callback),
        }
    }

    fn deliver(&self, id: ObserverId, version: u64, snapshot: &HashSet<T>) {
        if version <= self.since {
            return;
        }
        let mut callback = self.callback.lock();
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        if catch_unwind(AssertUnwindSafe(|| (*callback)(snapshot))).is_err() {
            warn!(observer = id, version, "observer panicked during notification");
        }
    }
}

// == Dispatch Message ==
pub(crate) enum Dispatch<T> {
    /// Membership changed; `snapshot` is the set right after the change
    Changed {
        version: u64,
        snapshot: Arc<HashSet<T>>,
    },
    /// Acknowledged once every earlier message has been delivered
    Flush(oneshot::Sender<()>),
}

/// Spawns the dispatcher. It stops once every sender is dropped and the
/// queue is drained.
pub(crate) fn spawn_dispatcher<T>(
    mut rx: mpsc::UnboundedReceiver<Dispatch<T>>,
    observers: Registry<T>,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
{
    tokio::spawn(async move {
        debug!("favorites dispatcher started");

        while let Some(message) = rx.recv().await {
            match message {
                Dispatch::Changed { version, snapshot } => {
                    // Registry lock is released before any callback runs.
                    let targets: Vec<(ObserverId, Arc<Observer<T>>)> = observers
                        .read()
                        .iter()
                        .map(|(id, observer)| (*id, Arc::clone(observer)))
                        .collect();

                    for (id, observer) in targets {
                        observer.deliver(id, version, &snapshot);
                    }
                    debug!(version, "notification delivered");
                }
                Dispatch::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }

        debug!("favorites dispatcher stopped");
    })
}
