//! Time-boxed cache for first-page library results.
//!
//! Only first pages (`offset == 0`) are ever stored; continuation pages
//! are merged into the live collections and refetched on demand. Entries
//! expire `ttl` after insertion and are evicted on the next lookup.

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;

use crate::model::{FilterSpec, MediaItem, MediaKind, SortOption};

/// Bounded entry count; eviction of a live entry only costs a refetch.
const CACHE_CAPACITY: usize = 64;

struct CacheEntry {
    items: Vec<MediaItem>,
    stored_at: Instant,
}

pub struct PageCache {
    entries: LruCache<String, CacheEntry>,
    ttl: Duration,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(CACHE_CAPACITY).unwrap()),
            ttl,
        }
    }

    /// Composite key: entity kind, sort option, serialized filter (which
    /// carries the context qualifier).
    pub fn cache_key(kind: MediaKind, sort: SortOption, filter: &FilterSpec) -> String {
        format!("{}|{}|{}", kind, sort.order_by(), filter.cache_token())
    }

    /// Live entry for `key`, or `None`. An entry past its TTL is treated
    /// as absent and evicted here.
    pub fn get(&mut self, key: &str) -> Option<Vec<MediaItem>> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.stored_at.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            self.entries.pop(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.items.clone())
    }

    pub fn insert(&mut self, key: String, items: Vec<MediaItem>) {
        self.entries.put(
            key,
            CacheEntry {
                items,
                stored_at: Instant::now(),
            },
        );
    }

    /// Coarse invalidation: drops every entry. Favorite toggles use this
    /// rather than prefix-matching affected keys; the refetch cost is
    /// accepted as policy.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
