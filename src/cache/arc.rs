use std::collections::HashMap;

use crate::cache::base::{Cache, CacheBase};
use crate::record::{CacheEntry, TraceRecord};
use crate::table::RecencyDeque;

const AVERAGE_BLOCK_SIZE_BYTES: f64 = 16.0 * 1024.0;

/// Adaptive Replacement Cache (Megiddo & Modha): four recency lists, T1/T2
/// hold live entries, B1/B2 remember evicted keys ("ghosts") to learn
/// whether the workload favors recency or frequency, with a target size
/// `p` for T1 that adapts on every ghost hit.
pub struct ArcCache {
    base: CacheBase,
    table: HashMap<String, CacheEntry>,
    t1: RecencyDeque<String>,
    b1: RecencyDeque<String>,
    t2: RecencyDeque<String>,
    b2: RecencyDeque<String>,
    p: f64,
    c: f64,
}

impl ArcCache {
    pub fn new(cache_size: u64) -> Self {
        ArcCache {
            base: CacheBase::new(cache_size, false),
            table: HashMap::new(),
            t1: RecencyDeque::new(),
            b1: RecencyDeque::new(),
            t2: RecencyDeque::new(),
            b2: RecencyDeque::new(),
            p: 0.0,
            c: cache_size as f64 / AVERAGE_BLOCK_SIZE_BYTES,
        }
    }

    /// Makes room for `key` (about to be admitted), following the four ARC
    /// eviction cases. `key` is checked against B2 membership because the
    /// caller may still be mid-way through processing a B2 ghost hit.
    fn replace(&mut self, key: &str, value_size: u64) {
        while self.base.used_size + value_size > self.base.cache_size {
            let demote_from_t1 = self.t1.len() > 0
                && (self.b2.contains(&key.to_string()) || (self.t1.len() as f64) > self.p);
            if demote_from_t1 {
                if let Some(old) = self.t1.pop_back() {
                    if let Some(entry) = self.table.remove(&old) {
                        self.base.used_size -= entry.value_size;
                    }
                    self.b1.push_front(old);
                }
            } else if let Some(old) = self.t2.pop_back() {
                if let Some(entry) = self.table.remove(&old) {
                    self.base.used_size -= entry.value_size;
                }
                self.b2.push_front(old);
            } else if let Some(old) = self.t1.pop_back() {
                if let Some(entry) = self.table.remove(&old) {
                    self.base.used_size -= entry.value_size;
                }
                self.b1.push_front(old);
            } else {
                break;
            }
        }
    }
}

impl Cache for ArcCache {
    fn base(&self) -> &CacheBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CacheBase {
        &mut self.base
    }

    fn cache_name(&self) -> String {
        "arc".to_string()
    }

    fn lookup(&mut self, _record: &TraceRecord, key: &str, _hash: u64) -> bool {
        let owned = key.to_string();
        if self.t1.remove(&owned) {
            self.t2.push_front(owned);
            true
        } else if self.t2.contains(&owned) {
            self.t2.push_front(owned);
            true
        } else {
            false
        }
    }

    fn evict(&mut self, _record: &TraceRecord, key: &str, _hash: u64, value_size: u64) {
        let owned = key.to_string();
        if self.b1.contains(&owned) {
            let ratio = (self.b2.len() as f64 / self.b1.len() as f64).max(1.0);
            self.p = self.c.min(self.p + ratio);
            self.replace(key, value_size);
            self.b1.remove(&owned);
            self.t2.push_front(owned);
        } else if self.b2.contains(&owned) {
            let ratio = (self.b1.len() as f64 / self.b2.len() as f64).max(1.0);
            self.p = (self.p - ratio).max(0.0);
            self.replace(key, value_size);
            self.b2.remove(&owned);
            self.t2.push_front(owned);
        } else {
            self.replace(key, value_size);
            while (self.t1.len() + self.b1.len()) as f64 >= self.c && self.b1.len() > 0 {
                self.b1.pop_back();
            }
            let mut total = self.t1.len() + self.b1.len() + self.t2.len() + self.b2.len();
            while (total as f64) >= 2.0 * self.c && self.b2.len() > 0 {
                self.b2.pop_back();
                total -= 1;
            }
            self.t1.push_front(owned);
        }
    }

    fn insert(&mut self, record: &TraceRecord, key: &str, _hash: u64, value_size: u64) {
        // `evict` already placed `key` into T1 or T2; only the value-size
        // bookkeeping table needs updating here.
        self.table.insert(key.to_string(), CacheEntry::new(value_size, record, 0));
    }

    fn should_admit(&mut self, _record: &TraceRecord, _key: &str, _hash: u64, _value_size: u64) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(block_id: u64, block_size: u64) -> TraceRecord {
        TraceRecord {
            access_time_us: 0,
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
    fn repeated_access_promotes_from_t1_to_t2() {
        let mut cache = ArcCache::new(1 << 20);
        cache.access(&record(1, 16 * 1024));
        assert!(cache.t1.contains(&"b1".to_string()));
        cache.access(&record(1, 16 * 1024));
        assert!(cache.t2.contains(&"b1".to_string()));
        assert!(!cache.t1.contains(&"b1".to_string()));
    }

    #[test]
    fn ghost_hit_in_b1_raises_p() {
        let mut cache = ArcCache::new(16 * 1024 * 4);
        for i in 0..8u64 {
            cache.access(&record(i, 16 * 1024));
        }
        assert!(cache.b1.len() > 0);
        let before = cache.p;
        let ghost = cache.b1.iter_back_to_front().next().cloned();
        if let Some(ghost_key) = ghost {
            let block_id: u64 = ghost_key[1..].parse().unwrap();
            cache.access(&record(block_id, 16 * 1024));
            assert!(cache.p >= before);
        }
    }
}
