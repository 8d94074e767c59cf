//! Request-coalescing cache with single-flight fetches.
//!
//! One instance serves one guild. Concurrent callers asking for the same key
//! share a single underlying fetch; everyone else waits on the bucket's
//! condition and observes the one result. A failed or panicking fetch clears
//! the bucket and wakes the waiters so the next caller retries.

use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

/// The cache flavor handed out per guild by the tracker: untyped values the
/// consumer downcasts, keyed by snowflake id.
pub type GuildCache = Cache<u64, Arc<dyn Any + Send + Sync>>;

/// Hit/miss counters, monotonically increasing over the cache lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
enum BucketState<V> {
    /// A fetch is in flight; waiters sleep on the condvar.
    Fetching,
    Ready(V),
}

#[derive(Debug)]
struct Bucket<V> {
    state: BucketState<V>,
    created: Instant,
    /// Kind discriminator recorded at insertion, for bulk invalidation.
    kind: &'static str,
}

/// A keyed cache with at-most-one concurrent fetch per key and age-based
/// eviction. `V` is cloned out on every read; wrap large values in `Arc`.
#[derive(Debug)]
pub struct Cache<K, V> {
    store: Mutex<HashMap<K, Bucket<V>>>,
    cond: Condvar,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Cache<K, V> {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            cond: Condvar::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Read a value. Blocks while a fetch for the key is in flight so the
    /// caller never observes a half-initialized bucket.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut store = self.store.lock().unwrap();
        loop {
            match store.get(key) {
                None => return None,
                Some(bucket) => match &bucket.state {
                    BucketState::Fetching => {
                        store = self.cond.wait(store).unwrap();
                    }
                    BucketState::Ready(v) => return Some(v.clone()),
                },
            }
        }
    }

    /// Store a value directly, replacing any existing bucket for the key.
    pub fn set(&self, key: K, kind: &'static str, value: V) {
        let mut store = self.store.lock().unwrap();
        store.insert(
            key,
            Bucket {
                state: BucketState::Ready(value),
                created: Instant::now(),
                kind,
            },
        );
    }

    /// Delete a key. Returns whether it was present.
    pub fn del(&self, key: &K) -> bool {
        let mut store = self.store.lock().unwrap();
        store.remove(key).is_some()
    }

    /// Delete every key whose bucket was inserted under `kind`, leaving
    /// other kinds untouched. Returns the number removed.
    pub fn del_kind(&self, kind: &'static str) -> usize {
        let mut store = self.store.lock().unwrap();
        let before = store.len();
        store.retain(|_, bucket| bucket.kind != kind);
        before - store.len()
    }

    /// Remove every bucket created before `threshold`. Returns the number
    /// evicted.
    pub fn evict_before(&self, threshold: Instant) -> usize {
        let mut store = self.store.lock().unwrap();
        let before = store.len();
        store.retain(|_, bucket| bucket.created >= threshold);
        before - store.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.store.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value for `key`, or run `fetch_fn` to produce it.
    ///
    /// At most one fetch runs per key at any instant; concurrent callers
    /// wait and share the result. The cache lock is released while
    /// `fetch_fn` runs, so a slow fetch never blocks other keys. On error
    /// or panic the bucket is removed and waiters are woken to retry; the
    /// panic itself surfaces only in the initiating caller.
    pub fn fetch<E, F>(&self, key: K, kind: &'static str, fetch_fn: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let mut store = self.store.lock().unwrap();
        loop {
            match store.get(&key) {
                None => break,
                Some(bucket) => match &bucket.state {
                    BucketState::Fetching => {
                        store = self.cond.wait(store).unwrap();
                    }
                    BucketState::Ready(v) => {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        return Ok(v.clone());
                    }
                },
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        store.insert(
            key.clone(),
            Bucket {
                state: BucketState::Fetching,
                created: Instant::now(),
                kind,
            },
        );
        drop(store);

        // If fetch_fn unwinds, the guard clears the bucket and wakes the
        // waiters on the way out; the panic keeps propagating to us alone.
        let guard = FetchGuard { cache: self, key: &key };
        let result = fetch_fn();

        let mut store = self.store.lock().unwrap();
        match result {
            Ok(value) => {
                if let Some(bucket) = store.get_mut(&key) {
                    bucket.state = BucketState::Ready(value.clone());
                }
                std::mem::forget(guard);
                drop(store);
                self.cond.notify_all();
                Ok(value)
            }
            Err(err) => {
                store.remove(&key);
                std::mem::forget(guard);
                drop(store);
                self.cond.notify_all();
                Err(err)
            }
        }
    }
}

struct FetchGuard<'a, K, V>
where
    K: Hash + Eq + Clone,
{
    cache: &'a Cache<K, V>,
    key: &'a K,
}

impl<K, V> Drop for FetchGuard<'_, K, V>
where
    K: Hash + Eq + Clone,
{
    fn drop(&mut self) {
        if let Ok(mut store) = self.cache.store.lock() {
            store.remove(self.key);
        }
        self.cache.cond.notify_all();
    }
}
