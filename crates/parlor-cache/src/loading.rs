// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Size-bounded loading cache with scope-based invalidation.
//!
//! Entries are stored under serialized [`Key`]s and evicted by LRU order,
//! by total byte budget, by optional TTL, or by [`FlusherRequest`]. The lock
//! is never held across an await; concurrent misses on the same key may both
//! run the loader, last write wins.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lru::LruCache;
use tracing::debug;

use parlor_core::ParlorError;

use crate::key::{FlusherRequest, Key};

/// Bounds for a memory cache.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Maximum number of entries.
    pub max_keys: usize,
    /// Entries larger than this are returned but never stored.
    pub max_value_size: usize,
    /// Total byte budget across all entries.
    pub max_cache_size: usize,
    /// Per-entry lifetime; `None` keeps entries until evicted.
    pub ttl: Option<Duration>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_keys: 1000,
            max_value_size: 65536,
            max_cache_size: 50 * 1024 * 1024,
            ttl: None,
        }
    }
}

struct Entry {
    data: Arc<Vec<u8>>,
    site: String,
    scopes: Vec<String>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

struct Inner {
    entries: LruCache<String, Entry>,
    total_bytes: usize,
}

impl Inner {
    fn remove(&mut self, key: &str) {
        if let Some(entry) = self.entries.pop(key) {
            self.total_bytes = self.total_bytes.saturating_sub(entry.data.len());
        }
    }
}

/// LRU loading cache keyed by [`Key`].
pub struct LoadingCache {
    inner: Mutex<Inner>,
    opts: CacheOptions,
}

impl LoadingCache {
    pub fn new(opts: CacheOptions) -> Self {
        let cap = NonZeroUsize::new(opts.max_keys).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(cap),
                total_bytes: 0,
            }),
            opts,
        }
    }

    /// Return the cached value for `key`, or run `loader` and store the
    /// result when it fits `max_value_size`.
    pub async fn get<L, F>(&self, key: &Key, loader: L) -> Result<Arc<Vec<u8>>, ParlorError>
    where
        L: FnOnce() -> F,
        F: Future<Output = Result<Vec<u8>, ParlorError>>,
    {
        let serialized = key.serialize();
        {
            let mut inner = self.lock();
            let now = Instant::now();
            if let Some(entry) = inner.entries.get(&serialized) {
                if entry.expired(now) {
                    inner.remove(&serialized);
                } else {
                    return Ok(Arc::clone(&entry.data));
                }
            }
        }

        let data = Arc::new(loader().await?);
        if data.len() <= self.opts.max_value_size {
            self.store(serialized, key, Arc::clone(&data));
        }
        Ok(data)
    }

    fn store(&self, serialized: String, key: &Key, data: Arc<Vec<u8>>) {
        let mut inner = self.lock();
        inner.remove(&serialized);
        inner.total_bytes += data.len();
        let entry = Entry {
            data,
            site: key.site().to_string(),
            scopes: key.scopes().to_vec(),
            expires_at: self.opts.ttl.map(|ttl| Instant::now() + ttl),
        };
        if let Some((_, evicted)) = inner.entries.push(serialized, entry) {
            inner.total_bytes = inner.total_bytes.saturating_sub(evicted.data.len());
        }
        while inner.total_bytes > self.opts.max_cache_size {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => {
                    inner.total_bytes = inner.total_bytes.saturating_sub(evicted.data.len());
                }
                None => break,
            }
        }
    }

    /// Evict every entry the request covers. Returns the eviction count.
    pub fn flush(&self, req: &FlusherRequest) -> usize {
        let mut inner = self.lock();
        let matched: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| req.matches(&e.site, &e.scopes))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &matched {
            inner.remove(key);
        }
        if !matched.is_empty() {
            debug!(site = %req.site, evicted = matched.len(), "cache flush");
        }
        matched.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes held.
    pub fn size_bytes(&self) -> usize {
        self.lock().total_bytes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Cache front picked from configuration: memory-backed or disabled.
pub enum CommentCache {
    Memory(LoadingCache),
    Disabled,
}

impl CommentCache {
    pub fn memory(opts: CacheOptions) -> Self {
        Self::Memory(LoadingCache::new(opts))
    }

    pub fn disabled() -> Self {
        Self::Disabled
    }

    pub async fn get<L, F>(&self, key: &Key, loader: L) -> Result<Arc<Vec<u8>>, ParlorError>
    where
        L: FnOnce() -> F,
        F: Future<Output = Result<Vec<u8>, ParlorError>>,
    {
        match self {
            Self::Memory(cache) => cache.get(key, loader).await,
            Self::Disabled => Ok(Arc::new(loader().await?)),
        }
    }

    pub fn flush(&self, req: &FlusherRequest) -> usize {
        match self {
            Self::Memory(cache) => cache.flush(req),
            Self::Disabled => 0,
        }
    }
}
