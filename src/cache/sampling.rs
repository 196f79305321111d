use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cache::base::{Cache, CacheBase};
use crate::policy::{RankingContext, SubPolicy};
use crate::record::{CacheEntry, TraceRecord};
use crate::table::SamplingHashTable;

/// How many live entries a sample-based cache inspects per eviction round.
/// Matches the analyzer this was distilled from: large enough to usually
/// find a victim in one round, small enough that eviction stays O(1)
/// relative to cache size.
const SAMPLE_SIZE: usize = 64;

/// Chooses which sub-policy should drive the next eviction, and folds the
/// eventual reward for that choice back into its own model. Thompson
/// Sampling and LinUCB both implement this; `SamplingCache<S>` supplies
/// every other piece of cache behavior identically for both.
pub trait PolicySelector {
    fn select_policy(
        &mut self,
        record: &TraceRecord,
        sub_policies: &mut [SubPolicy],
        key: &str,
        rng: &mut StdRng,
    ) -> usize;
}

/// A cache whose eviction victim is chosen by sampling a handful of live
/// entries and letting a bandit-selected sub-policy rank them, rather than
/// maintaining an exact ordering structure for every possible policy.
pub struct SamplingCache<S: PolicySelector> {
    base: CacheBase,
    table: SamplingHashTable,
    sub_policies: Vec<SubPolicy>,
    selector: S,
    rng: StdRng,
    /// Base name reported to the driver (the CLI `cache_type`, minus any
    /// `_hybrid` suffix; that suffix is reattached from `enable_cache_row_key`
    /// so the two can never drift apart).
    name: &'static str,
}

impl<S: PolicySelector> SamplingCache<S> {
    pub fn new(cache_size: u64, hybrid: bool, sub_policies: Vec<SubPolicy>, selector: S, seed: u64, name: &'static str) -> Self {
        let policy_names = sub_policies.iter().map(|p| p.name()).collect();
        SamplingCache {
            base: CacheBase::new(cache_size, hybrid).with_policy_stats(policy_names),
            table: SamplingHashTable::new(),
            sub_policies,
            selector,
            rng: StdRng::seed_from_u64(seed),
            name,
        }
    }
}

impl<S: PolicySelector> Cache for SamplingCache<S> {
    fn base(&self) -> &CacheBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CacheBase {
        &mut self.base
    }

    fn cache_name(&self) -> String {
        if self.base.enable_cache_row_key {
            format!("{}_hybrid", self.name)
        } else {
            self.name.to_string()
        }
    }

    fn lookup(&mut self, record: &TraceRecord, key: &str, hash: u64) -> bool {
        match self.table.lookup(key, hash) {
            Some(old) => {
                let sequence = self.base.miss_ratio_stats.num_accesses();
                self.table.insert(key.to_string(), hash, old.touched(record, sequence));
                true
            }
            None => false,
        }
    }

    fn evict(&mut self, record: &TraceRecord, key: &str, hash: u64, value_size: u64) {
        let _ = hash;
        let policy_idx = self.selector.select_policy(record, &mut self.sub_policies, key, &mut self.rng);
        self.sub_policies[policy_idx].clear_evicted(key);
        if let Some(stats) = self.base.policy_stats.as_mut() {
            stats.update(record.access_time_us, policy_idx);
        }
        if let Some(stats) = self.base.per_hour_policy_stats.as_mut() {
            stats.update(record.access_time_us, policy_idx);
        }

        while self.base.used_size + value_size > self.base.cache_size {
            let mut samples = self.table.random_sample(SAMPLE_SIZE, &mut self.rng);
            if samples.is_empty() {
                break;
            }
            let ctx = RankingContext { now_us: record.access_time_us };
            self.sub_policies[policy_idx].prioritize(&mut samples, &ctx);

            for entry in samples {
                if self.table.delete(&entry.key, entry.hash).is_some() {
                    self.base.used_size -= entry.value.value_size;
                    self.sub_policies[policy_idx].mark_evicted(&entry.key);
                }
                if self.base.used_size + value_size <= self.base.cache_size {
                    break;
                }
            }
        }
    }

    fn insert(&mut self, record: &TraceRecord, key: &str, hash: u64, value_size: u64) {
        let sequence = self.base.miss_ratio_stats.num_accesses();
        let entry = CacheEntry::new(value_size, record, sequence);
        self.table.insert(key.to_string(), hash, entry);
    }

    fn should_admit(&mut self, _record: &TraceRecord, _key: &str, _hash: u64, _value_size: u64) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::thompson::ThompsonSelector;
    use crate::policy::SubPolicyKind;

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
    fn evicts_down_to_capacity_under_pressure() {
        let sub_policies = vec![SubPolicy::new(SubPolicyKind::Lru), SubPolicy::new(SubPolicyKind::Lfu)];
        let mut cache = SamplingCache::new(30, false, sub_policies, ThompsonSelector::new(2), 7, "ts");
        for i in 0..10u64 {
            cache.access(&record(i, 10, i as i64));
        }
        assert!(cache.used_size() <= cache.cache_size());
    }

    #[test]
    fn single_policy_cache_still_selects_it_every_time() {
        let sub_policies = vec![SubPolicy::new(SubPolicyKind::Lru)];
        let mut cache = SamplingCache::new(20, false, sub_policies, ThompsonSelector::new(1), 1, "pylru");
        for i in 0..5u64 {
            cache.access(&record(i, 10, i as i64));
        }
        let stats = cache.policy_stats().unwrap();
        assert_eq!(stats.policy_names(), &["lru"]);
    }
}
