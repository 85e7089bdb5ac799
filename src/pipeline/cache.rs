//! Bounded output cache: serves repeated requests for already-computed
//! regions without re-executing the node.
//!
//! The store is a fixed-capacity ring with FIFO eviction by insertion order.
//! Workloads here are scrub-through-a-bounded-window, where FIFO and LRU hit
//! rates are close and the ring stays trivially simple.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;

use crate::data::DataObject;
use crate::extent::Extent;

/// Identity of a cached result: the output port plus the resolved update
/// extent of the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub port: usize,
    pub extent: Extent,
}

impl RequestKey {
    pub fn new(port: usize, extent: Extent) -> Self {
        RequestKey { port, extent }
    }
}

/// Hit and occupancy counters, exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub capacity: usize,
    pub len: usize,
    pub hits: u64,
    pub misses: u64,
}

struct CacheEntry {
    key: RequestKey,
    data: Arc<dyn DataObject>,
    produced_at: u64,
}

pub(crate) struct OutputCache {
    capacity: usize,
    entries: VecDeque<CacheEntry>,
    hits: u64,
    misses: u64,
}

impl OutputCache {
    pub fn new(capacity: usize) -> Self {
        OutputCache {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Linear scan for an entry matching `key` that was produced at or after
    /// `valid_after`. A matching but stale entry is a miss; it stays in place
    /// and is replaced when the fresh result is inserted.
    pub fn lookup(&mut self, key: &RequestKey, valid_after: u64) -> Option<Arc<dyn DataObject>> {
        for entry in &self.entries {
            if entry.key == *key && entry.produced_at >= valid_after {
                self.hits += 1;
                return Some(Arc::clone(&entry.data));
            }
        }
        self.misses += 1;
        None
    }

    /// Inserts a result, replacing any entry with the same key and evicting
    /// the oldest-inserted entry when the ring is full.
    pub fn insert(&mut self, key: RequestKey, data: Arc<dyn DataObject>, produced_at: u64) {
        self.entries.retain(|e| e.key != key);
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(CacheEntry {
            key,
            data,
            produced_at,
        });
    }

    /// Resizes the ring, dropping every currently cached entry.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.entries.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            capacity: self.capacity,
            len: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ScalarField;
    use crate::extent::StructuredExtent;

    fn entry(min: i32, max: i32) -> (RequestKey, Arc<dyn DataObject>) {
        let extent = StructuredExtent::line(min, max);
        let field = ScalarField::new(extent, vec![0.0; extent.num_points()]);
        (RequestKey::new(0, extent.into()), Arc::new(field))
    }

    #[test]
    fn eviction_is_first_in_first_out() {
        let mut cache = OutputCache::new(2);
        let (k1, d1) = entry(0, 9);
        let (k2, d2) = entry(10, 19);
        let (k3, d3) = entry(20, 29);
        cache.insert(k1, d1, 1);
        cache.insert(k2, d2, 2);
        cache.insert(k3, d3, 3);

        assert!(cache.lookup(&k1, 0).is_none());
        assert!(cache.lookup(&k2, 0).is_some());
        assert!(cache.lookup(&k3, 0).is_some());
        assert_eq!(cache.stats().len, 2);
    }

    #[test]
    fn stale_entries_do_not_hit() {
        let mut cache = OutputCache::new(2);
        let (k1, d1) = entry(0, 9);
        cache.insert(k1, d1, 5);
        assert!(cache.lookup(&k1, 6).is_none());
        assert!(cache.lookup(&k1, 5).is_some());
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn reinsert_replaces_the_stale_entry() {
        let mut cache = OutputCache::new(2);
        let (k1, d1) = entry(0, 9);
        let (_, d1b) = entry(0, 9);
        cache.insert(k1, d1, 1);
        cache.insert(k1, d1b, 7);
        assert_eq!(cache.stats().len, 1);
        assert!(cache.lookup(&k1, 7).is_some());
    }

    #[test]
    fn resize_drops_everything() {
        let mut cache = OutputCache::new(2);
        let (k1, d1) = entry(0, 9);
        cache.insert(k1, d1, 1);
        cache.set_capacity(4);
        assert_eq!(cache.stats().len, 0);
        assert_eq!(cache.capacity(), 4);
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut cache = OutputCache::new(0);
        let (k1, d1) = entry(0, 9);
        cache.insert(k1, d1, 1);
        assert!(cache.lookup(&k1, 0).is_none());
    }
}
