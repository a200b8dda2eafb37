//! Listing cache gateway
//!
//! Directory listings are cached as JSON under `dir:v1:<catalog path>`. The
//! coordinator invalidates a path's listing and its parent's listing after
//! every catalog mutation; the TTL only backs up missed invalidations.

use crate::paths;
use dirmirror_db::PathRecord;
use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// Key namespace for cached listings; bump the version when the value format changes.
pub const LISTING_KEY_PREFIX: &str = "dir:v1:";

/// Cache key for the listing of a catalog directory.
pub fn listing_key(path: &str) -> String {
    format!("{LISTING_KEY_PREFIX}{path}")
}

/// Key/value store the gateway sits on.
pub trait ListingCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn invalidate(&self, key: &str);
    /// Drop every key starting with `key_prefix`.
    fn invalidate_prefix(&self, key_prefix: &str);
}

/// In-process cache with TTL and a capacity bound.
#[derive(Clone)]
pub struct MokaListingCache {
    cache: Cache<String, String>,
}

impl MokaListingCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries.max(1))
            .time_to_live(ttl)
            .build();
        Self { cache }
    }
}

impl ListingCache for MokaListingCache {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key)
    }

    fn set(&self, key: &str, value: String) {
        self.cache.insert(key.to_string(), value);
    }

    fn invalidate(&self, key: &str) {
        self.cache.invalidate(key);
    }

    fn invalidate_prefix(&self, key_prefix: &str) {
        let doomed: Vec<Arc<String>> = self
            .cache
            .iter()
            .filter(|(key, _)| key.starts_with(key_prefix))
            .map(|(key, _)| key)
            .collect();
        for key in doomed {
            self.cache.invalidate(key.as_str());
        }
    }
}

/// Hit/miss counters since the gateway was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Typed listing access and invalidation rules over a [`ListingCache`].
///
/// Every invalidation bumps a generation counter. Readers that filled a
/// listing from the store use [`Self::put_listing_if_current`] so a listing
/// read before a concurrent mutation is never written back after it.
#[derive(Clone)]
pub struct CacheGateway {
    cache: Arc<dyn ListingCache>,
    generation: Arc<Mutex<u64>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl CacheGateway {
    pub fn new(cache: Arc<dyn ListingCache>) -> Self {
        Self {
            cache,
            generation: Arc::new(Mutex::new(0)),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current invalidation generation.
    pub fn generation(&self) -> u64 {
        *self.lock_generation()
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Gateway over an in-process moka cache.
    pub fn in_memory(max_entries: u64, ttl: Duration) -> Self {
        Self::new(Arc::new(MokaListingCache::new(max_entries, ttl)))
    }

    /// Cached listing for `path`, if present and decodable.
    pub fn get_listing(&self, path: &str) -> Option<Vec<PathRecord>> {
        let key = listing_key(path);
        let Some(raw) = self.cache.get(&key) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        match serde_json::from_str(&raw) {
            Ok(records) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(records)
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Evicting undecodable cached listing");
                self.cache.invalidate(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put_listing(&self, path: &str, records: &[PathRecord]) {
        if let Some(json) = encode_listing(path, records) {
            self.cache.set(&listing_key(path), json);
        }
    }

    /// Store a listing only if nothing was invalidated since `seen_generation`.
    ///
    /// Returns whether the listing was stored.
    pub fn put_listing_if_current(
        &self,
        path: &str,
        records: &[PathRecord],
        seen_generation: u64,
    ) -> bool {
        let Some(json) = encode_listing(path, records) else {
            return false;
        };
        let generation = self.lock_generation();
        if *generation != seen_generation {
            debug!(path = %path, "Listing changed while it was read; not caching");
            return false;
        }
        self.cache.set(&listing_key(path), json);
        true
    }

    /// Invalidate the listing of `path` and of its parent.
    pub fn invalidate_path(&self, path: &str) {
        debug!(path = %path, "Invalidating cached listings");
        let mut generation = self.lock_generation();
        *generation += 1;
        self.cache.invalidate(&listing_key(path));
        self.cache.invalidate(&listing_key(paths::parent_of(path)));
    }

    /// [`Self::invalidate_path`] plus every listing below `dir`.
    pub fn invalidate_subtree(&self, dir: &str) {
        self.invalidate_path(dir);
        let prefix = if dir.is_empty() {
            LISTING_KEY_PREFIX.to_string()
        } else {
            format!("{}/", listing_key(dir))
        };
        let mut generation = self.lock_generation();
        *generation += 1;
        self.cache.invalidate_prefix(&prefix);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

fn encode_listing(path: &str, records: &[PathRecord]) -> Option<String> {
    match serde_json::to_string(records) {
        Ok(json) => Some(json),
        Err(err) => {
            warn!(path = %path, error = %err, "Failed to encode listing for cache");
            None
        }
    }
}
