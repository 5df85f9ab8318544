//! Fetch Registry Module
//!
//! Tracks in-flight fetches per key so concurrent requests share one fetch,
//! and lets each waiter leave independently.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::RandomState;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::debug;

/// Identifies one waiter's registration on an in-flight fetch.
pub type WaiterId = u64;

#[derive(Debug)]
struct InFlight<O> {
    /// Distinguishes this fetch from a later one for the same key
    generation: u64,
    waiters: HashMap<WaiterId, oneshot::Sender<O>, RandomState>,
    abort: AbortHandle,
}

/// A registered waiter: its id and the channel its outcome arrives on.
#[derive(Debug)]
pub struct Waiter<O> {
    pub id: WaiterId,
    pub outcome: oneshot::Receiver<O>,
}

// == Registration ==
/// Result of `FetchRegistry::register`.
#[derive(Debug)]
pub enum Registration<O> {
    /// The precheck produced an outcome, nothing was registered
    Ready(O),
    /// Attached to a fetch that was already running
    Joined(Waiter<O>),
    /// Started a new fetch with this waiter as its first member
    Started(Waiter<O>),
}

// == Cancel Outcome ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The waiter left; the fetch keeps running for the others
    Detached,
    /// The waiter was the last one; the fetch was aborted and retired
    Aborted,
    /// No such waiter (already completed, cancelled, or never registered)
    Unknown,
}

// == Fetch Registry ==
/// At most one in-flight fetch per key, each with a set of waiters.
#[derive(Debug)]
pub struct FetchRegistry<K, O> {
    fetches: Mutex<HashMap<K, InFlight<O>, RandomState>>,
    next_id: AtomicU64,
}

impl<K, O> Default for FetchRegistry<K, O>
where
    K: Hash + Eq + Clone + std::fmt::Debug,
    O: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, O> FetchRegistry<K, O>
where
    K: Hash + Eq + Clone + std::fmt::Debug,
    O: Clone,
{
    pub fn new() -> Self {
        Self {
            fetches: Mutex::new(HashMap::with_hasher(RandomState::new())),
            next_id: AtomicU64::new(1),
        }
    }

    // == Register ==
    /// Attaches a new waiter for `key`, starting a fetch only when none runs.
    ///
    /// Runs atomically with respect to every other registry operation:
    /// - an in-flight fetch for `key` gains a waiter;
    /// - otherwise `precheck` may short-circuit with a ready outcome;
    /// - otherwise `start` is called with the new fetch's generation and must
    ///   return the handle that aborts it.
    ///
    /// `start` runs under the registry lock, so the fetch it launches cannot
    /// complete before it is registered. It must not block.
    pub fn register<P, S>(&self, key: &K, precheck: P, start: S) -> Registration<O>
    where
        P: FnOnce() -> Option<O>,
        S: FnOnce(u64) -> AbortHandle,
    {
        let mut fetches = self.fetches.lock();

        if let Some(fetch) = fetches.get_mut(key) {
            let (id, waiter) = self.new_waiter();
            fetch.waiters.insert(id, waiter.0);
            debug!(key = ?key, waiter = id, waiters = fetch.waiters.len(), "joined in-flight fetch");
            return Registration::Joined(Waiter {
                id,
                outcome: waiter.1,
            });
        }

        if let Some(outcome) = precheck() {
            return Registration::Ready(outcome);
        }

        let generation = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (id, waiter) = self.new_waiter();
        let mut waiters = HashMap::with_hasher(RandomState::new());
        waiters.insert(id, waiter.0);
        let abort = start(generation);
        fetches.insert(
            key.clone(),
            InFlight {
                generation,
                waiters,
                abort,
            },
        );
        debug!(key = ?key, waiter = id, generation, "started fetch");

        Registration::Started(Waiter {
            id,
            outcome: waiter.1,
        })
    }

    // == Complete ==
    /// Retires the fetch of the given generation and hands `outcome` to
    /// every remaining waiter. Returns how many waiters were notified.
    ///
    /// A stale generation (the fetch was cancelled, possibly replaced by a
    /// newer one) is ignored and notifies nobody.
    pub fn complete(&self, key: &K, generation: u64, outcome: O) -> usize {
        let retired = {
            let mut fetches = self.fetches.lock();
            let current = fetches.get(key).map(|fetch| fetch.generation);
            if current == Some(generation) {
                fetches.remove(key)
            } else {
                None
            }
        };

        let Some(fetch) = retired else {
            debug!(key = ?key, generation, "completion for retired fetch ignored");
            return 0;
        };

        fetch
            .waiters
            .into_values()
            .map(|waiter| waiter.send(outcome.clone()).is_ok())
            .filter(|sent| *sent)
            .count()
    }

    // == Cancel ==
    /// Removes one waiter. The fetch is aborted only if it was the last one.
    ///
    /// The cancelled waiter's channel closes without a value.
    pub fn cancel(&self, key: &K, waiter: WaiterId) -> CancelOutcome {
        let mut fetches = self.fetches.lock();

        let Some(fetch) = fetches.get_mut(key) else {
            return CancelOutcome::Unknown;
        };
        if fetch.waiters.remove(&waiter).is_none() {
            return CancelOutcome::Unknown;
        }
        if !fetch.waiters.is_empty() {
            debug!(key = ?key, waiter, remaining = fetch.waiters.len(), "waiter detached");
            return CancelOutcome::Detached;
        }

        if let Some(fetch) = fetches.remove(key) {
            fetch.abort.abort();
        }
        debug!(key = ?key, waiter, "last waiter left, fetch aborted");
        CancelOutcome::Aborted
    }

    /// Whether a fetch for `key` is running.
    pub fn contains(&self, key: &K) -> bool {
        self.fetches.lock().contains_key(key)
    }

    /// Number of waiters attached to the fetch for `key`.
    pub fn waiter_count(&self, key: &K) -> usize {
        self.fetches
            .lock()
            .get(key)
            .map_or(0, |fetch| fetch.waiters.len())
    }

    /// Number of fetches currently running.
    pub fn in_flight(&self) -> usize {
        self.fetches.lock().len()
    }

    fn new_waiter(&self) -> (WaiterId, (oneshot::Sender<O>, oneshot::Receiver<O>)) {
        (self.next_id.fetch_add(1, Ordering::Relaxed), oneshot::channel())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;
    use tokio::sync::oneshot::error::TryRecvError;

    fn idle_task() -> AbortHandle {
        tokio::spawn(pending::<()>()).abort_handle()
    }

    fn expect_waiter(registration: Registration<u32>) -> Waiter<u32> {
        match registration {
            Registration::Joined(waiter) | Registration::Started(waiter) => waiter,
            Registration::Ready(_) => panic!("expected a waiter"),
        }
    }

    #[tokio::test]
    async fn test_first_register_starts_fetch() {
        let registry: FetchRegistry<&str, u32> = FetchRegistry::new();
        let mut started = 0;

        let registration = registry.register(&"a", || None, |_| {
            started += 1;
            idle_task()
        });

        assert!(matches!(registration, Registration::Started(_)));
        assert_eq!(started, 1);
        assert!(registry.contains(&"a"));
        assert_eq!(registry.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_second_register_joins_without_starting() {
        let registry: FetchRegistry<&str, u32> = FetchRegistry::new();

        registry.register(&"a", || None, |_| idle_task());
        let registration = registry.register(
            &"a",
            || panic!("precheck must not run while a fetch is in flight"),
            |_| panic!("must not start a second fetch"),
        );

        assert!(matches!(registration, Registration::Joined(_)));
        assert_eq!(registry.waiter_count(&"a"), 2);
        assert_eq!(registry.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_precheck_short_circuits() {
        let registry: FetchRegistry<&str, u32> = FetchRegistry::new();

        let registration = registry.register(&"a", || Some(7), |_| panic!("must not start"));

        assert!(matches!(registration, Registration::Ready(7)));
        assert!(!registry.contains(&"a"));
    }

    #[tokio::test]
    async fn test_complete_notifies_every_waiter_once() {
        let registry: FetchRegistry<&str, u32> = FetchRegistry::new();
        let mut generation = 0;

        let first = expect_waiter(registry.register(&"a", || None, |g| {
            generation = g;
            idle_task()
        }));
        let second = expect_waiter(registry.register(&"a", || None, |_| idle_task()));

        assert_eq!(registry.complete(&"a", generation, 42), 2);
        assert_eq!(first.outcome.await.unwrap(), 42);
        assert_eq!(second.outcome.await.unwrap(), 42);
        assert!(!registry.contains(&"a"));
        assert_eq!(registry.complete(&"a", generation, 42), 0);
    }

    #[tokio::test]
    async fn test_complete_counts_only_listening_waiters() {
        let registry: FetchRegistry<&str, u32> = FetchRegistry::new();
        let mut generation = 0;

        let gone = expect_waiter(registry.register(&"a", || None, |g| {
            generation = g;
            idle_task()
        }));
        let listening = expect_waiter(registry.register(&"a", || None, |_| idle_task()));
        drop(gone);

        assert_eq!(registry.complete(&"a", generation, 9), 1);
        assert_eq!(listening.outcome.await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_stale_generation_is_ignored() {
        let registry: FetchRegistry<&str, u32> = FetchRegistry::new();
        let mut old_generation = 0;

        let old = expect_waiter(registry.register(&"a", || None, |g| {
            old_generation = g;
            idle_task()
        }));
        assert_eq!(registry.cancel(&"a", old.id), CancelOutcome::Aborted);

        let fresh = expect_waiter(registry.register(&"a", || None, |_| idle_task()));
        assert_eq!(registry.complete(&"a", old_generation, 1), 0);
        assert!(registry.contains(&"a"));
        assert_eq!(registry.waiter_count(&"a"), 1);
        drop(fresh);
    }

    #[tokio::test]
    async fn test_cancel_one_of_many_keeps_fetch() {
        let registry: FetchRegistry<&str, u32> = FetchRegistry::new();
        let task = tokio::spawn(pending::<()>());
        let abort = task.abort_handle();
        let mut generation = 0;

        let mut first = expect_waiter(registry.register(&"a", || None, |g| {
            generation = g;
            abort
        }));
        let second = expect_waiter(registry.register(&"a", || None, |_| idle_task()));

        assert_eq!(registry.cancel(&"a", first.id), CancelOutcome::Detached);
        assert!(matches!(first.outcome.try_recv(), Err(TryRecvError::Closed)));
        assert!(!task.is_finished());

        assert_eq!(registry.complete(&"a", generation, 5), 1);
        assert_eq!(second.outcome.await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_cancel_last_waiter_aborts_fetch() {
        let registry: FetchRegistry<&str, u32> = FetchRegistry::new();
        let task = tokio::spawn(pending::<()>());
        let abort = task.abort_handle();

        let first = expect_waiter(registry.register(&"a", || None, |_| abort));
        let second = expect_waiter(registry.register(&"a", || None, |_| idle_task()));

        assert_eq!(registry.cancel(&"a", first.id), CancelOutcome::Detached);
        assert_eq!(registry.cancel(&"a", second.id), CancelOutcome::Aborted);
        assert!(!registry.contains(&"a"));

        let err = task.await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let registry: FetchRegistry<&str, u32> = FetchRegistry::new();

        let waiter = expect_waiter(registry.register(&"a", || None, |_| idle_task()));
        assert_eq!(registry.cancel(&"a", waiter.id), CancelOutcome::Aborted);
        assert_eq!(registry.cancel(&"a", waiter.id), CancelOutcome::Unknown);
        assert_eq!(registry.cancel(&"b", waiter.id), CancelOutcome::Unknown);
    }
}
