//! Time-bounded single-flight cache.
//!
//! Each key moves through a small state machine:
//!
//! ```text
//!  Empty ──get──► Loading(shared handle) ──ok──► Ready(value, expires_at)
//!    ▲                    │                          │
//!    └──────── err ───────┘      get after expiry ───┘──► Loading
//! ```
//!
//! Empty is the absence of an entry. Every `get` arriving while a key is
//! Loading awaits the same shared handle, so the loader runs exactly once per
//! loading window no matter how many callers pile up. Transitions happen under
//! the per-entry lock of an `scc::HashMap`, which keeps them atomic on the
//! multi-threaded runtime.
//!
//! Loads run in their own task. A load that has started always finishes and
//! settles the entry, even if every caller waiting on it has gone away.
use std::{
    fmt,
    future::Future,
    hash::Hash,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use scc::{HashMap, hash_map::Entry};
use thiserror::Error;
use tokio::time::Instant;

/// Error type produced by cache loaders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

type Loader<K, V> = dyn Fn(K) -> BoxFuture<'static, Result<V, BoxError>> + Send + Sync;
type PendingLoad<V> = Shared<BoxFuture<'static, Result<V, CacheError>>>;

/// Errors returned from [`SingleFlightCache::get`]. Cloneable because one
/// failed load is reported to every caller that was waiting on it.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum CacheError {
    /// The loader returned an error. The entry was reset; the next `get` retries.
    #[error("cache load failed: {0}")]
    Load(Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// The load task panicked or was cancelled by the runtime.
    #[error("cache load task did not complete: {0}")]
    Aborted(String),
}

/// Result type for cache lookups
pub type CacheResult<T> = Result<T, CacheError>;

enum CacheEntry<V> {
    Loading {
        generation: u64,
        pending: PendingLoad<V>,
    },
    Ready {
        value: V,
        /// `None` never expires.
        expires_at: Option<Instant>,
    },
}

struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    loader: Box<Loader<K, V>>,
    max_age: Duration,
    generation: AtomicU64,
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Move the entry out of Loading, provided it still belongs to the load
    /// identified by `generation`. `None` resets the key to Empty.
    async fn settle(&self, key: &K, generation: u64, loaded: Option<&V>) {
        let Entry::Occupied(mut occupied) = self.entries.entry_async(key.clone()).await else {
            return;
        };
        let owned = matches!(
            occupied.get(),
            CacheEntry::Loading { generation: current, .. } if *current == generation
        );
        if !owned {
            return;
        }
        match loaded {
            Some(value) => {
                *occupied.get_mut() = CacheEntry::Ready {
                    value: value.clone(),
                    expires_at: expiry_after(self.max_age),
                };
            }
            None => {
                let _ = occupied.remove();
            }
        }
    }
}

/// A zero `max_age` means the value never expires. Very large lifetimes
/// saturate instead of overflowing.
fn expiry_after(max_age: Duration) -> Option<Instant> {
    if max_age.is_zero() {
        return None;
    }
    let now = Instant::now();
    Some(
        now.checked_add(max_age)
            .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365 * 30)),
    )
}

/// A TTL cache that never runs more than one load per key at a time.
pub struct SingleFlightCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for SingleFlightCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache whose values live for `max_age` after their load
    /// completes. `Duration::ZERO` keeps a loaded value until it is
    /// invalidated.
    pub fn new<F, Fut>(max_age: Duration, loader: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, BoxError>> + Send + 'static,
    {
        let loader: Box<Loader<K, V>> = Box::new(move |key: K| loader(key).boxed());
        Self {
            inner: Arc::new(Inner {
                entries: HashMap::new(),
                loader,
                max_age,
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn max_age(&self) -> Duration {
        self.inner.max_age
    }

    /// Number of keys currently Loading or Ready.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Return the cached value for `key`, loading it if the key is Empty or
    /// its value has expired, or joining the load already in flight.
    pub async fn get(&self, key: &K) -> CacheResult<V> {
        let pending = match self.inner.entries.entry_async(key.clone()).await {
            Entry::Occupied(mut occupied) => {
                let in_flight = match occupied.get() {
                    CacheEntry::Ready { value, expires_at }
                        if expires_at.is_none_or(|at| Instant::now() < at) =>
                    {
                        return Ok(value.clone());
                    }
                    CacheEntry::Ready { .. } => None,
                    CacheEntry::Loading { pending, .. } => Some(pending.clone()),
                };
                match in_flight {
                    Some(pending) => pending,
                    None => {
                        tracing::debug!(?key, "cached value expired, reloading");
                        let (entry, pending) = self.start_load(key.clone());
                        *occupied.get_mut() = entry;
                        pending
                    }
                }
            }
            Entry::Vacant(vacant) => {
                tracing::debug!(?key, "cache miss, loading");
                let (entry, pending) = self.start_load(key.clone());
                vacant.insert_entry(entry);
                pending
            }
        };

        pending.await
    }

    /// Forget `key`. A load in flight still completes for its waiters but no
    /// longer populates the cache.
    pub async fn invalidate(&self, key: &K) -> bool {
        self.inner.entries.remove_async(key).await.is_some()
    }

    /// Spawn the loader for `key`. Must be called while holding the entry
    /// lock so the returned Loading entry is in place before the load settles.
    fn start_load(&self, key: K) -> (CacheEntry<V>, PendingLoad<V>) {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);

        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let started = Instant::now();
            let result = (inner.loader)(task_key.clone()).await;
            match &result {
                Ok(value) => {
                    tracing::debug!(key = ?task_key, elapsed = ?started.elapsed(), "cache load finished");
                    inner.settle(&task_key, generation, Some(value)).await;
                }
                Err(e) => {
                    tracing::warn!(key = ?task_key, error = %e, "cache load failed");
                    inner.settle(&task_key, generation, None).await;
                }
            }
            result.map_err(|e| CacheError::Load(Arc::from(e)))
        });

        let weak: Weak<Inner<K, V>> = Arc::downgrade(&self.inner);
        let pending = async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.settle(&key, generation, None).await;
                    }
                    Err(CacheError::Aborted(join_error.to_string()))
                }
            }
        }
        .boxed()
        .shared();

        (
            CacheEntry::Loading {
                generation,
                pending: pending.clone(),
            },
            pending,
        )
    }
}
