use std::collections::HashMap;

use crate::cache::base::{Cache, CacheBase};
use crate::record::{CacheEntry, TraceRecord};
use crate::table::RecencyDeque;

/// Textbook LRU: a hash map for O(1) lookup plus a recency deque for O(1)
/// move-to-front and evict-the-tail.
pub struct LruCache {
    base: CacheBase,
    table: HashMap<String, CacheEntry>,
    order: RecencyDeque<String>,
}

impl LruCache {
    pub fn new(cache_size: u64) -> Self {
        LruCache {
            base: CacheBase::new(cache_size, false),
            table: HashMap::new(),
            order: RecencyDeque::new(),
        }
    }
}

impl Cache for LruCache {
    fn base(&self) -> &CacheBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CacheBase {
        &mut self.base
    }

    fn cache_name(&self) -> String {
        "lru".to_string()
    }

    fn lookup(&mut self, record: &TraceRecord, key: &str, _hash: u64) -> bool {
        let sequence = self.base.miss_ratio_stats.num_accesses();
        match self.table.get_mut(key) {
            Some(entry) => {
                *entry = entry.touched(record, sequence);
                self.order.push_front(key.to_string());
                true
            }
            None => false,
        }
    }

    fn evict(&mut self, _record: &TraceRecord, _key: &str, _hash: u64, value_size: u64) {
        while self.base.used_size + value_size > self.base.cache_size {
            let Some(victim) = self.order.pop_back() else { break };
            if let Some(entry) = self.table.remove(&victim) {
                self.base.used_size -= entry.value_size;
            }
        }
    }

    fn insert(&mut self, record: &TraceRecord, key: &str, _hash: u64, value_size: u64) {
        let sequence = self.base.miss_ratio_stats.num_accesses();
        self.table.insert(key.to_string(), CacheEntry::new(value_size, record, sequence));
        self.order.push_front(key.to_string());
    }

    fn should_admit(&mut self, _record: &TraceRecord, _key: &str, _hash: u64, _value_size: u64) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(block_id: u64, block_size: u64, access_time_us: i64) -> TraceRecord {
        TraceRecord {
            access_time_us,
            block_id,
            block_type: 0,
            block_size,
            cf_id: 0,
            cf_name: String::new(),
            level: 0,
            fd: 0,
            caller: 0,
            no_insert: false,
            get_id: 0,
            key_id: 0,
            kv_size: 0,
            is_hit_observed: false,
            next_access_seq_no: 0,
        }
    }

    #[test]
    fn basic_hit_and_miss() {
        let mut cache = LruCache::new(100);
        let r1 = record(1, 10, 0);
        cache.access(&r1);
        assert_eq!(cache.miss_ratio_stats().num_misses(), 1);
        cache.access(&r1);
        assert_eq!(cache.miss_ratio_stats().num_accesses(), 2);
        assert_eq!(cache.miss_ratio_stats().num_misses(), 1);
    }

    #[test]
    fn evicts_least_recently_used_first() {
        let mut cache = LruCache::new(30);
        cache.access(&record(1, 10, 0));
        cache.access(&record(2, 10, 1));
        cache.access(&record(3, 10, 2));
        // cache full at 30; touching 1 again makes 2 the LRU victim.
        cache.access(&record(1, 10, 3));
        cache.access(&record(4, 10, 4));
        assert_eq!(cache.used_size(), 30);
        assert!(!cache.table.contains_key("b2"));
        assert!(cache.table.contains_key("b1"));
        assert!(cache.table.contains_key("b3"));
        assert!(cache.table.contains_key("b4"));
    }

    #[test]
    fn oversized_value_is_never_admitted() {
        let mut cache = LruCache::new(10);
        cache.access(&record(1, 11, 0));
        assert_eq!(cache.used_size(), 0);
    }
}
