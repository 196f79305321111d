//! Sub-policies are the building blocks a sample-based cache chooses between:
//! each one only knows how to rank a handful of sampled entries from
//! worst-to-keep to best-to-keep, and to remember which keys it evicted so a
//! bandit can later score whether that eviction turned out to be a miss.

use std::collections::HashSet;

use crate::record::HashEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubPolicyKind {
    Lru,
    Mru,
    Lfu,
    Hyperbolic,
}

impl SubPolicyKind {
    pub fn name(&self) -> &'static str {
        match self {
            SubPolicyKind::Lru => "lru",
            SubPolicyKind::Mru => "mru",
            SubPolicyKind::Lfu => "lfu",
            SubPolicyKind::Hyperbolic => "hyperbolic",
        }
    }
}

/// Context a sub-policy needs to rank entries but that isn't carried on the
/// entry itself (currently just wall-clock position in the trace).
pub struct RankingContext {
    pub now_us: i64,
}

/// A ranking strategy plus the bookkeeping a bandit needs to score its own
/// eviction decisions after the fact.
pub struct SubPolicy {
    kind: SubPolicyKind,
    evicted_keys: HashSet<String>,
}

impl SubPolicy {
    pub fn new(kind: SubPolicyKind) -> Self {
        SubPolicy {
            kind,
            evicted_keys: HashSet::new(),
        }
    }

    pub fn kind(&self) -> SubPolicyKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Ranks `entry` for eviction ordering: `(primary, num_hits)`, compared
    /// lexicographically ascending so the lowest-ranked entry is evicted
    /// first. `num_hits` only breaks ties on `primary`.
    fn rank_key(&self, entry: &HashEntry, ctx: &RankingContext) -> (f64, u64) {
        let num_hits = entry.value.num_hits;
        match self.kind {
            SubPolicyKind::Lru => (entry.value.last_access_sequence as f64, num_hits),
            SubPolicyKind::Mru => (-(entry.value.last_access_sequence as f64), num_hits),
            SubPolicyKind::Lfu => (num_hits as f64, num_hits),
            SubPolicyKind::Hyperbolic => {
                let age_secs = ((ctx.now_us - entry.value.insertion_time_us).max(0)) as f64 / 1_000_000.0;
                let size = entry.value.value_size as f64;
                if age_secs == 0.0 || size == 0.0 {
                    (f64::MIN, num_hits)
                } else {
                    (num_hits as f64 / (age_secs * size), num_hits)
                }
            }
        }
    }

    /// Sorts `samples` ascending by rank, so `samples[0]` is the entry this
    /// sub-policy would evict first.
    pub fn prioritize(&self, samples: &mut [HashEntry], ctx: &RankingContext) {
        samples.sort_by(|a, b| {
            self.rank_key(a, ctx)
                .partial_cmp(&self.rank_key(b, ctx))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Records that `key` was just evicted under this sub-policy's watch.
    pub fn mark_evicted(&mut self, key: &str) {
        self.evicted_keys.insert(key.to_string());
    }

    /// Clears the evicted-mark for `key`, because it is about to be
    /// re-admitted (a cache miss that brings it back defeats the bandit's
    /// "was this eviction regretted" signal if the mark lingers).
    pub fn clear_evicted(&mut self, key: &str) {
        self.evicted_keys.remove(key);
    }

    /// 0 if `key` was evicted by this sub-policy and hasn't been referenced
    /// again since (a miss that vindicates the eviction), 1 otherwise.
    pub fn reward(&self, key: &str) -> u8 {
        if self.evicted_keys.contains(key) {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CacheEntry;

    fn entry(key: &str, last_access_sequence: u64, num_hits: u64) -> HashEntry {
        HashEntry {
            key: key.to_string(),
            hash: 0,
            value: CacheEntry {
                value_size: 16,
                insertion_time_us: 0,
                num_hits,
                last_access_sequence,
                last_access_time_us: 0,
                cf_id: 0,
                level: 0,
                block_type: 0,
            },
        }
    }

    #[test]
    fn lru_ranks_oldest_access_first() {
        let policy = SubPolicy::new(SubPolicyKind::Lru);
        let mut samples = vec![entry("a", 10, 0), entry("b", 1, 0), entry("c", 5, 0)];
        let ctx = RankingContext { now_us: 100 };
        policy.prioritize(&mut samples, &ctx);
        assert_eq!(samples[0].key, "b");
        assert_eq!(samples[2].key, "a");
    }

    #[test]
    fn mru_ranks_newest_access_first() {
        let policy = SubPolicy::new(SubPolicyKind::Mru);
        let mut samples = vec![entry("a", 10, 0), entry("b", 1, 0), entry("c", 5, 0)];
        let ctx = RankingContext { now_us: 100 };
        policy.prioritize(&mut samples, &ctx);
        assert_eq!(samples[0].key, "a");
    }

    #[test]
    fn lfu_ranks_fewest_hits_first() {
        let policy = SubPolicy::new(SubPolicyKind::Lfu);
        let mut samples = vec![entry("a", 0, 10), entry("b", 0, 0), entry("c", 0, 3)];
        let ctx = RankingContext { now_us: 100 };
        policy.prioritize(&mut samples, &ctx);
        assert_eq!(samples[0].key, "b");
    }

    #[test]
    fn reward_reflects_eviction_mark() {
        let mut policy = SubPolicy::new(SubPolicyKind::Lru);
        assert_eq!(policy.reward("a"), 1);
        policy.mark_evicted("a");
        assert_eq!(policy.reward("a"), 0);
        policy.clear_evicted("a");
        assert_eq!(policy.reward("a"), 1);
    }
}
