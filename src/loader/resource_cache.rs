//! Resource Cache Module
//!
//! "Load or fetch" on top of `KeyedLru` and `FetchRegistry`: cache hits
//! complete at once, misses share a single fetch per key, and every caller
//! gets its own cancellation token.

use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, KeyedLru};
use crate::error::{DecodeError, LoadError};
use crate::fetch::{ByteFetcher, CancelOutcome, FetchRegistry, Registration, WaiterId};

/// What every waiter of a fetch receives.
pub type LoadOutcome<V> = Result<Arc<V>, LoadError>;

// == Loader Stats ==
/// Fetch activity on top of the underlying cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoaderStats {
    /// Network fetches started
    pub fetches_started: u64,
    /// Loads that attached to an already running fetch
    pub joined: u64,
    /// Fetches that delivered a decoded resource
    pub fetches_succeeded: u64,
    /// Fetches that ended in a fetch or decode failure
    pub fetches_failed: u64,
    /// Fetches aborted because every waiter cancelled
    pub fetches_aborted: u64,
    /// Fetches running right now
    pub in_flight: usize,
}

#[derive(Debug, Default)]
struct Counters {
    fetches_started: AtomicU64,
    joined: AtomicU64,
    fetches_succeeded: AtomicU64,
    fetches_failed: AtomicU64,
    fetches_aborted: AtomicU64,
}

// == Load Token ==
/// Identifies one `load` call so it can be cancelled on its own.
///
/// Tokens of loads served straight from the cache are inert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadToken<K> {
    key: K,
    waiter: Option<WaiterId>,
}

impl<K> LoadToken<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Whether the load waited on a fetch rather than hitting the cache.
    pub fn is_pending(&self) -> bool {
        self.waiter.is_some()
    }
}

// == Load ==
/// A pending or completed load. Await it for the outcome.
///
/// A load whose token was cancelled resolves to `LoadError::Cancelled`.
/// Dropping a `Load` without cancelling leaves its fetch running, so the
/// result still lands in the cache.
#[derive(Debug)]
pub struct Load<K, V> {
    token: LoadToken<K>,
    state: LoadState<V>,
}

#[derive(Debug)]
enum LoadState<V> {
    Ready(Option<LoadOutcome<V>>),
    Waiting(oneshot::Receiver<LoadOutcome<V>>),
}

impl<K: Clone, V> Load<K, V> {
    pub fn token(&self) -> LoadToken<K> {
        self.token.clone()
    }
}

// The state is never structurally pinned.
impl<K, V> Unpin for Load<K, V> {}

impl<K, V> Future for Load<K, V> {
    type Output = LoadOutcome<V>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            LoadState::Ready(outcome) => {
                Poll::Ready(outcome.take().unwrap_or(Err(LoadError::Cancelled)))
            }
            LoadState::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(LoadError::Cancelled))),
        }
    }
}

struct Shared<K, V, F> {
    lru: KeyedLru<K, Arc<V>>,
    registry: FetchRegistry<K, LoadOutcome<V>>,
    fetcher: F,
    counters: Counters,
}

// == Resource Cache ==
/// Cache of decoded resources with single-flight fetching.
///
/// Cheap to clone; clones share the same cache and registry. `load` spawns
/// fetches on the current tokio runtime.
pub struct ResourceCache<K, V, F> {
    shared: Arc<Shared<K, V, F>>,
}

impl<K, V, F> Clone for ResourceCache<K, V, F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V, F> ResourceCache<K, V, F>
where
    K: Hash + Eq + Clone + std::fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
    F: ByteFetcher<K>,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` decoded resources.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, fetcher: F) -> Self {
        Self {
            shared: Arc::new(Shared {
                lru: KeyedLru::new(capacity),
                registry: FetchRegistry::new(),
                fetcher,
                counters: Counters::default(),
            }),
        }
    }

    // == Load ==
    /// Returns the cached resource for `key`, or fetches and decodes it.
    ///
    /// Concurrent loads of the same key share one fetch; the `decode` of the
    /// load that started the fetch is the one that runs, later ones are
    /// dropped unused. Failures are not cached and are never retried here.
    pub fn load<D>(&self, key: K, decode: D) -> Load<K, V>
    where
        D: FnOnce(Bytes) -> Result<V, DecodeError> + Send + 'static,
    {
        let shared = &self.shared;

        if let Some(value) = shared.lru.get(&key) {
            debug!(key = ?key, "cache hit");
            return Load {
                token: LoadToken { key, waiter: None },
                state: LoadState::Ready(Some(Ok(value))),
            };
        }

        let registration = shared.registry.register(
            &key,
            // The miss is already counted; re-check without touching stats.
            || shared.lru.peek(&key).map(Ok),
            |generation| {
                let task = Arc::clone(shared);
                let task_key = key.clone();
                tokio::spawn(async move { task.run_fetch(task_key, generation, decode).await })
                    .abort_handle()
            },
        );

        let waiter = match registration {
            Registration::Ready(outcome) => {
                return Load {
                    token: LoadToken { key, waiter: None },
                    state: LoadState::Ready(Some(outcome)),
                };
            }
            Registration::Joined(waiter) => {
                shared.counters.joined.fetch_add(1, Ordering::Relaxed);
                waiter
            }
            Registration::Started(waiter) => {
                shared.counters.fetches_started.fetch_add(1, Ordering::Relaxed);
                waiter
            }
        };

        Load {
            token: LoadToken {
                key,
                waiter: Some(waiter.id),
            },
            state: LoadState::Waiting(waiter.outcome),
        }
    }

    // == Cancel ==
    /// Withdraws one load. Its fetch stops only if no other load waits on it.
    ///
    /// Returns false for inert tokens and loads that already completed.
    pub fn cancel(&self, token: &LoadToken<K>) -> bool {
        let Some(waiter) = token.waiter else {
            return false;
        };

        match self.shared.registry.cancel(&token.key, waiter) {
            CancelOutcome::Detached => true,
            CancelOutcome::Aborted => {
                self.shared
                    .counters
                    .fetches_aborted
                    .fetch_add(1, Ordering::Relaxed);
                info!(key = ?token.key, "fetch cancelled");
                true
            }
            CancelOutcome::Unknown => false,
        }
    }

    /// Cached resource for `key`, without fetching or touching recency.
    pub fn cached(&self, key: &K) -> Option<Arc<V>> {
        self.shared.lru.peek(key)
    }

    /// Drops the cached resource for `key`. In-flight fetches are unaffected.
    pub fn evict(&self, key: &K) -> Option<Arc<V>> {
        self.shared.lru.evict(key)
    }

    /// Whether a fetch for `key` is running.
    pub fn is_fetching(&self, key: &K) -> bool {
        self.shared.registry.contains(key)
    }

    pub fn in_flight(&self) -> usize {
        self.shared.registry.in_flight()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.shared.lru.stats()
    }

    pub fn loader_stats(&self) -> LoaderStats {
        let counters = &self.shared.counters;
        LoaderStats {
            fetches_started: counters.fetches_started.load(Ordering::Relaxed),
            joined: counters.joined.load(Ordering::Relaxed),
            fetches_succeeded: counters.fetches_succeeded.load(Ordering::Relaxed),
            fetches_failed: counters.fetches_failed.load(Ordering::Relaxed),
            fetches_aborted: counters.fetches_aborted.load(Ordering::Relaxed),
            in_flight: self.in_flight(),
        }
    }
}

impl<K, V, F> Shared<K, V, F>
where
    K: Hash + Eq + Clone + std::fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
    F: ByteFetcher<K>,
{
    async fn run_fetch<D>(self: Arc<Self>, key: K, generation: u64, decode: D)
    where
        D: FnOnce(Bytes) -> Result<V, DecodeError>,
    {
        info!(key = ?key, generation, "fetch started");

        let outcome = match self.fetcher.fetch(&key).await {
            Ok(bytes) => decode(bytes).map(Arc::new).map_err(LoadError::from),
            Err(err) => Err(LoadError::from(err)),
        };

        match &outcome {
            Ok(value) => {
                // Visible in the cache before the fetch is retired, so no
                // load can slip in between and start a redundant fetch.
                self.lru.put(key.clone(), Arc::clone(value));
                self.counters.fetches_succeeded.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.counters.fetches_failed.fetch_add(1, Ordering::Relaxed);
                warn!(key = ?key, error = %err, "fetch failed");
            }
        }

        let notified = self.registry.complete(&key, generation, outcome);
        info!(key = ?key, generation, notified, "fetch finished");
    }
}
