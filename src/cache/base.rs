//! The shared plumbing every cache variant embeds: used/cache size
//! bookkeeping, miss-ratio and (optionally) policy-selection statistics, and
//! the row-key coalescing state for traces that carry get/key ids.
//!
//! [`Cache`] plays the role the original analyzer's `Cache` base class plays:
//! `access`/`access_row`/`access_kv` are template methods built once here and
//! shared by every concrete policy, which only supplies `lookup`/`evict`/
//! `insert`/`should_admit`.

use std::collections::HashMap;

use crate::record::{block_key, row_key, TraceRecord};
use crate::stats::{MissRatioStats, PolicyStats};
use crate::table::RecencyDeque;

const MINUTE_SECS: i64 = 60;
const HOUR_SECS: i64 = 3600;

/// Bounds how many distinct `get_id`s the row-key coalescing map tracks at
/// once. spec.md leaves the exact bound an open question; we resolve it here
/// by evicting the least-recently-touched get_id once the map is full, the
/// same way the caches themselves bound memory. See DESIGN.md.
pub const ROW_KEY_MAP_CAPACITY: usize = 1_000_000;

#[derive(Default)]
pub struct RowKeyState {
    pub hit_observed: bool,
    /// key_id -> whether the row value for that key_id has already been
    /// admitted into the row namespace.
    pub seen_keys: HashMap<u64, bool>,
}

pub struct RowKeyCoalescer {
    map: HashMap<u64, RowKeyState>,
    order: RecencyDeque<u64>,
    capacity: usize,
}

impl RowKeyCoalescer {
    pub fn new(capacity: usize) -> Self {
        RowKeyCoalescer {
            map: HashMap::new(),
            order: RecencyDeque::new(),
            capacity,
        }
    }

    /// Returns the state for `get_id`, creating it (and evicting the
    /// least-recently-touched entry if the map is full) if necessary.
    pub fn entry(&mut self, get_id: u64) -> &mut RowKeyState {
        if !self.map.contains_key(&get_id) {
            if self.map.len() >= self.capacity {
                if let Some(stale) = self.order.pop_back() {
                    self.map.remove(&stale);
                }
            }
            self.map.insert(get_id, RowKeyState::default());
        }
        self.order.push_front(get_id);
        self.map.get_mut(&get_id).expect("just inserted")
    }
}

impl Default for RowKeyCoalescer {
    fn default() -> Self {
        Self::new(ROW_KEY_MAP_CAPACITY)
    }
}

/// Fields every cache variant carries regardless of its eviction algorithm.
pub struct CacheBase {
    pub cache_size: u64,
    pub used_size: u64,
    pub enable_cache_row_key: bool,
    pub row_key_map: RowKeyCoalescer,
    pub miss_ratio_stats: MissRatioStats,
    pub per_hour_miss_ratio_stats: MissRatioStats,
    pub policy_stats: Option<PolicyStats>,
    pub per_hour_policy_stats: Option<PolicyStats>,
}

impl CacheBase {
    pub fn new(cache_size: u64, enable_cache_row_key: bool) -> Self {
        CacheBase {
            cache_size,
            used_size: 0,
            enable_cache_row_key,
            row_key_map: RowKeyCoalescer::default(),
            miss_ratio_stats: MissRatioStats::new(MINUTE_SECS),
            per_hour_miss_ratio_stats: MissRatioStats::new(HOUR_SECS),
            policy_stats: None,
            per_hour_policy_stats: None,
        }
    }

    pub fn with_policy_stats(mut self, policy_names: Vec<&'static str>) -> Self {
        self.policy_stats = Some(PolicyStats::new(MINUTE_SECS, policy_names.clone()));
        self.per_hour_policy_stats = Some(PolicyStats::new(HOUR_SECS, policy_names));
        self
    }

    pub fn reset_warmup_counters(&mut self) {
        self.miss_ratio_stats.reset_counters();
        self.per_hour_miss_ratio_stats.reset_counters();
    }
}

/// Polymorphic entry point the simulator drives: every eviction policy,
/// classical or sample-based, implements this.
pub trait Cache {
    fn base(&self) -> &CacheBase;
    fn base_mut(&mut self) -> &mut CacheBase;
    fn cache_name(&self) -> String;

    fn lookup(&mut self, record: &TraceRecord, key: &str, hash: u64) -> bool;
    fn evict(&mut self, record: &TraceRecord, key: &str, hash: u64, value_size: u64);
    fn insert(&mut self, record: &TraceRecord, key: &str, hash: u64, value_size: u64);
    fn should_admit(&mut self, record: &TraceRecord, key: &str, hash: u64, value_size: u64) -> bool;

    fn used_size(&self) -> u64 {
        self.base().used_size
    }

    fn cache_size(&self) -> u64 {
        self.base().cache_size
    }

    fn miss_ratio_stats(&self) -> &MissRatioStats {
        &self.base().miss_ratio_stats
    }

    fn per_hour_miss_ratio_stats(&self) -> &MissRatioStats {
        &self.base().per_hour_miss_ratio_stats
    }

    fn policy_stats(&self) -> Option<&PolicyStats> {
        self.base().policy_stats.as_ref()
    }

    fn per_hour_policy_stats(&self) -> Option<&PolicyStats> {
        self.base().per_hour_policy_stats.as_ref()
    }

    fn reset_warmup_counters(&mut self) {
        self.base_mut().reset_warmup_counters();
    }

    /// Top-level entry point the simulator calls once per trace record.
    fn access(&mut self, record: &TraceRecord) {
        debug_assert!(self.used_size() <= self.cache_size());
        if self.base().enable_cache_row_key && record.caller == 1 && record.key_id != 0 && record.get_id != 0 {
            self.access_row(record);
        } else {
            let key = block_key(record);
            let is_hit = self.access_kv(record, &key, record.block_id, record.block_size, record.no_insert);
            self.update_stats(record.access_time_us, is_hit);
        }
    }

    /// Row-key coalescing: a `get_id` is one logical point-get that may
    /// touch several blocks. Once any record for a `get_id` is observed as a
    /// hit, every later record sharing that `get_id` counts as a hit too,
    /// without touching the underlying cache again.
    fn access_row(&mut self, record: &TraceRecord) {
        let get_id = record.get_id;
        let key_id = record.key_id;

        if self.base_mut().row_key_map.entry(get_id).hit_observed {
            self.update_stats(record.access_time_us, true);
            return;
        }

        let key_seen = self.base_mut().row_key_map.entry(get_id).seen_keys.get(&key_id).copied();
        if key_seen.is_none() {
            let row_key = row_key(record);
            let is_hit = self.access_kv(record, &row_key, key_id, record.kv_size, false);
            let inserted = record.kv_size > 0;
            let state = self.base_mut().row_key_map.entry(get_id);
            state.seen_keys.insert(key_id, inserted);
            state.hit_observed = is_hit;
        }

        if self.base_mut().row_key_map.entry(get_id).hit_observed {
            self.update_stats(record.access_time_us, true);
            return;
        }

        let blk_key = block_key(record);
        let is_hit = self.access_kv(record, &blk_key, record.block_id, record.block_size, record.no_insert);
        self.update_stats(record.access_time_us, is_hit);

        let already_inserted = self
            .base_mut()
            .row_key_map
            .entry(get_id)
            .seen_keys
            .get(&key_id)
            .copied()
            .unwrap_or(false);
        if record.kv_size > 0 && !already_inserted {
            let row_key = row_key(record);
            self.access_kv(record, &row_key, key_id, record.kv_size, false);
            self.base_mut().row_key_map.entry(get_id).seen_keys.insert(key_id, true);
        }
    }

    /// Looks up `key`; on miss, evicts room for it and admits it if the
    /// policy agrees to. Returns whether the access was a hit.
    fn access_kv(&mut self, record: &TraceRecord, key: &str, hash: u64, value_size: u64, no_insert: bool) -> bool {
        debug_assert!(self.used_size() <= self.cache_size());
        if self.lookup(record, key, hash) {
            return true;
        }
        if no_insert || value_size == 0 {
            return false;
        }
        if value_size > self.cache_size() {
            return false;
        }
        self.evict(record, key, hash, value_size);
        if self.should_admit(record, key, hash, value_size) {
            self.insert(record, key, hash, value_size);
            self.base_mut().used_size += value_size;
        }
        false
    }

    fn update_stats(&mut self, access_time_us: i64, is_hit: bool) {
        self.base_mut().miss_ratio_stats.update(access_time_us, is_hit);
        self.base_mut().per_hour_miss_ratio_stats.update(access_time_us, is_hit);
    }
}
