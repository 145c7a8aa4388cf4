//! Read-through TTL cache with single-flight loads, one store per cache kind.
//!
//! A caller hands [`CacheStore::get`] a loader. A fresh value is returned
//! without running it; otherwise every concurrent caller for the same key
//! shares one in-flight load and receives the same result. A failed load keeps
//! a still-fresh previous value for later callers and evicts the key otherwise.
//! Expiry is lazy (checked on access) and there is no capacity bound: the key
//! space of every store is small and fixed by the caller.

use crate::utils::fmt_duration;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

type LoadResult<T> = Result<T, CacheError>;
type SharedLoad<T> = Shared<BoxFuture<'static, LoadResult<T>>>;

/// A loader failure, shared verbatim with every caller waiting on that load.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    #[error("failed to load `{key}` into the {store} cache")]
    Load {
        store: &'static str,
        key: String,
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    },
}

/// An in-flight load. `generation` identifies this particular computation so
/// that a settling load never clobbers an entry owned by a newer one.
struct Pending<T> {
    generation: u64,
    load: SharedLoad<T>,
}

struct CacheEntry<T> {
    expires_at: Instant,
    value: Option<T>,
    pending: Option<Pending<T>>,
}

impl<T> CacheEntry<T> {
    fn vacant() -> Self {
        Self {
            expires_at: Instant::now(),
            value: None,
            pending: None,
        }
    }

    fn fresh_value(&self, now: Instant) -> Option<&T> {
        self.value.as_ref().filter(|_| now < self.expires_at)
    }

    fn is_loading(&self, generation: u64) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| pending.generation == generation)
    }
}

/// Introspection row for one store, reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub name: &'static str,
    pub ttl: Duration,
    pub entries: usize,
    pub loading: usize,
}

enum Lookup<T> {
    Hit(T),
    Wait(SharedLoad<T>),
}

struct StoreInner<T> {
    name: &'static str,
    ttl: Duration,
    entries: DashMap<String, CacheEntry<T>>,
    next_generation: AtomicU64,
}

/// Keyed read-through store for one cache kind. Clone-cheap; clones share entries.
pub struct CacheStore<T> {
    inner: Arc<StoreInner<T>>,
}

impl<T> Clone for CacheStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> CacheStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty store. `ttl` applies to every value this store holds.
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                name,
                ttl,
                entries: DashMap::new(),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Number of keys currently held, fresh or not.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let loading = self
            .inner
            .entries
            .iter()
            .filter(|entry| entry.pending.is_some())
            .count();
        CacheStats {
            name: self.inner.name,
            ttl: self.inner.ttl,
            entries: self.inner.entries.len(),
            loading,
        }
    }

    /// Return the cached value for `key` if it is still fresh. Never loads.
    pub fn peek(&self, key: &str) -> Option<T> {
        let entry = self.inner.entries.get(key)?;
        entry.fresh_value(Instant::now()).cloned()
    }

    /// Return the fresh value for `key`, or load it through `loader`.
    ///
    /// Concurrent callers for the same key share a single loader invocation.
    /// `loader` is only called when this caller is the one starting the load.
    pub async fn get<F, Fut>(&self, key: &str, loader: F) -> LoadResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        match self.lookup(key, loader, false) {
            Lookup::Hit(value) => Ok(value),
            Lookup::Wait(load) => load.await,
        }
    }

    /// Reload `key` even if a fresh value is cached.
    ///
    /// Joins a load that is already in flight instead of starting a second one.
    /// If the reload fails, the previous value keeps being served until it expires.
    pub async fn refresh<F, Fut>(&self, key: &str, loader: F) -> LoadResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        match self.lookup(key, loader, true) {
            Lookup::Hit(value) => Ok(value),
            Lookup::Wait(load) => load.await,
        }
    }

    fn lookup<F, Fut>(&self, key: &str, loader: F, force: bool) -> Lookup<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        // Fast path under the shard read lock.
        if !force && let Some(value) = self.peek(key) {
            trace!(store = self.inner.name, key, "cache hit");
            return Lookup::Hit(value);
        }

        // Check-and-publish happens under the shard write lock, so exactly one
        // caller observes the pending slot empty and starts the load.
        let mut entry = self
            .inner
            .entries
            .entry(key.to_owned())
            .or_insert_with(CacheEntry::vacant);

        if !force && let Some(value) = entry.fresh_value(Instant::now()) {
            trace!(store = self.inner.name, key, "cache hit");
            return Lookup::Hit(value.clone());
        }

        if let Some(pending) = &entry.pending {
            debug!(store = self.inner.name, key, "joining in-flight cache load");
            return Lookup::Wait(pending.load.clone());
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let load = Self::start_load(
            Arc::clone(&self.inner),
            key.to_owned(),
            generation,
            loader(),
        );
        entry.pending = Some(Pending {
            generation,
            load: load.clone(),
        });
        debug!(store = self.inner.name, key, generation, force, "cache load started");

        Lookup::Wait(load)
    }

    fn start_load<Fut>(
        inner: Arc<StoreInner<T>>,
        key: String,
        generation: u64,
        fut: Fut,
    ) -> SharedLoad<T>
    where
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        async move {
            let started = Instant::now();
            let outcome = fut.await;
            inner.settle(&key, generation, outcome, started)
        }
        .boxed()
        .shared()
    }
}

impl<T: Clone> StoreInner<T> {
    /// Record the outcome of load `generation` and produce the shared result.
    fn settle(
        &self,
        key: &str,
        generation: u64,
        outcome: anyhow::Result<T>,
        started: Instant,
    ) -> LoadResult<T> {
        let now = Instant::now();
        let elapsed = fmt_duration(now.duration_since(started));

        match outcome {
            Ok(value) => {
                let mut entry = self
                    .entries
                    .entry(key.to_owned())
                    .or_insert_with(CacheEntry::vacant);
                entry.value = Some(value.clone());
                entry.expires_at = now + self.ttl;
                if entry.is_loading(generation) {
                    entry.pending = None;
                }
                debug!(store = self.name, key, generation, elapsed, "cache load finished");
                Ok(value)
            }
            Err(error) => {
                let mut retained_stale = false;
                if let Entry::Occupied(mut occupied) = self.entries.entry(key.to_owned())
                    && occupied.get().is_loading(generation)
                {
                    if occupied.get().fresh_value(now).is_some() {
                        occupied.get_mut().pending = None;
                        retained_stale = true;
                    } else {
                        occupied.remove();
                    }
                }
                warn!(
                    store = self.name,
                    key,
                    generation,
                    elapsed,
                    retained_stale,
                    error = ?error,
                    "cache load failed"
                );
                Err(CacheError::Load {
                    store: self.name,
                    key: key.to_owned(),
                    source: Arc::from(Box::<dyn StdError + Send + Sync>::from(error)),
                })
            }
        }
    }
}
