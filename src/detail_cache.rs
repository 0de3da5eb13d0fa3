//! LRU cache for commit detail text.

use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;

pub const DEFAULT_CAPACITY: usize = 64;

/// Thread-safe LRU cache of rendered `git show` output, keyed by full hash.
pub struct DetailCache {
    cache: RwLock<LruCache<String, Vec<String>>>,
}

impl DetailCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(cap)),
        }
    }

    /// Cached lines for a commit. Counts as a use for eviction order.
    pub fn get(&self, hash: &str) -> Option<Vec<String>> {
        self.cache.write().get(hash).cloned()
    }

    pub fn insert(&self, hash: String, lines: Vec<String>) {
        self.cache.write().put(hash, lines);
    }
}

impl Default for DetailCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
