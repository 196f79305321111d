use std::cmp::Ordering;

use crate::cache::base::{Cache, CacheBase};
use crate::record::TraceRecord;
use crate::table::{Direction, PriorityTable};

/// A priority that orders by `f64` value. `PriorityTable` needs `Ord`, which
/// plain `f64` doesn't implement; every value GreedyDual-Size produces here
/// is finite and non-negative, so `partial_cmp` never returns `None`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Inflation(pub f64);

impl Eq for Inflation {}
impl Ord for Inflation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// GreedyDual-Size: every entry's priority is `L + size`, where `L` is an
/// inflation floor raised to the priority of whatever was just evicted, so
/// entries that survive multiple eviction rounds naturally become relatively
/// cheaper to keep than large entries admitted more recently.
pub struct GdSizeCache {
    base: CacheBase,
    table: PriorityTable<Inflation>,
    inflation: f64,
}

impl GdSizeCache {
    pub fn new(cache_size: u64) -> Self {
        GdSizeCache {
            base: CacheBase::new(cache_size, false),
            table: PriorityTable::new(Direction::Min),
            inflation: 0.0,
        }
    }
}

impl Cache for GdSizeCache {
    fn base(&self) -> &CacheBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CacheBase {
        &mut self.base
    }

    fn cache_name(&self) -> String {
        "gdsize".to_string()
    }

    fn lookup(&mut self, _record: &TraceRecord, key: &str, _hash: u64) -> bool {
        match self.table.size_of(key) {
            Some(size) => {
                self.table.upsert(key, Inflation(self.inflation + size as f64), size);
                true
            }
            None => false,
        }
    }

    fn evict(&mut self, _record: &TraceRecord, _key: &str, _hash: u64, value_size: u64) {
        while self.base.used_size + value_size > self.base.cache_size {
            let Some((_, priority, size)) = self.table.pop() else { break };
            self.inflation = priority.0;
            self.base.used_size -= size;
        }
    }

    fn insert(&mut self, _record: &TraceRecord, key: &str, _hash: u64, value_size: u64) {
        let previous = self
            .table
            .upsert(key, Inflation(self.inflation + value_size as f64), value_size);
        debug_assert!(previous.is_none());
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
    fn prefers_evicting_smaller_entries_when_freshly_inserted() {
        let mut cache = GdSizeCache::new(25);
        cache.access(&record(1, 20));
        cache.access(&record(2, 5));
        // Full at 25; inserting a third forces an eviction. The smaller,
        // equally-fresh entry (block 2) has the lower priority, so it goes
        // before the larger one.
        cache.access(&record(3, 5));
        assert!(cache.table.contains("b1"));
        assert!(!cache.table.contains("b2"));
    }

    #[test]
    fn inflation_floor_only_rises() {
        let mut cache = GdSizeCache::new(10);
        cache.access(&record(1, 10));
        cache.access(&record(2, 10));
        assert!(cache.inflation > 0.0);
    }
}
