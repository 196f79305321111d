//! A chained hash table sized by load factor, with O(1) uniform random
//! sampling over live entries. This is the structure the sample-based ML
//! caches use in place of the exact priority structures the classical
//! caches use, mirroring the custom `HashTable` the original block-cache
//! trace analyzer builds for exactly this purpose.

use crate::record::{CacheEntry, HashEntry};
use rand::Rng;

const INITIAL_BUCKET_COUNT: usize = 32;
const MIN_ELEMENTS_BEFORE_RESIZE: usize = 100;
const GROW_LOAD_FACTOR: usize = 4;
const SHRINK_LOAD_FACTOR: usize = 2;
const GROW_FACTOR: f64 = 1.5;
const SHRINK_FACTOR: f64 = 0.7;

pub struct SamplingHashTable {
    buckets: Vec<Vec<Option<HashEntry>>>,
    elements: usize,
}

impl SamplingHashTable {
    pub fn new() -> Self {
        SamplingHashTable {
            buckets: vec![Vec::new(); INITIAL_BUCKET_COUNT],
            elements: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements == 0
    }

    fn bucket_index(&self, hash: u64) -> usize {
        (hash as usize) % self.buckets.len()
    }

    pub fn lookup(&self, key: &str, hash: u64) -> Option<CacheEntry> {
        let idx = self.bucket_index(hash);
        self.buckets[idx]
            .iter()
            .flatten()
            .find(|e| e.key == key)
            .map(|e| e.value)
    }

    pub fn insert(&mut self, key: String, hash: u64, value: CacheEntry) {
        let idx = self.bucket_index(hash);
        if let Some(slot) = self.buckets[idx].iter_mut().flatten().find(|e| e.key == key) {
            slot.value = value;
            return;
        }
        let entry = HashEntry { key, hash, value };
        if let Some(slot) = self.buckets[idx].iter_mut().find(|s| s.is_none()) {
            *slot = Some(entry);
        } else {
            self.buckets[idx].push(Some(entry));
        }
        self.elements += 1;
        self.maybe_grow();
    }

    pub fn delete(&mut self, key: &str, hash: u64) -> Option<HashEntry> {
        let idx = self.bucket_index(hash);
        let slot = self.buckets[idx].iter_mut().find(|s| matches!(s, Some(e) if e.key == key))?;
        let removed = slot.take();
        self.elements -= 1;
        self.maybe_shrink();
        removed
    }

    /// Walks forward from a randomly chosen bucket, collecting up to `n`
    /// live entries (cloned, since sub-policies need owned snapshots to rank
    /// and the table may be mutated between sampling and eviction).
    pub fn random_sample(&self, n: usize, rng: &mut impl Rng) -> Vec<HashEntry> {
        if self.buckets.is_empty() || self.elements == 0 {
            return Vec::new();
        }
        let start = rng.random_range(0..self.buckets.len());
        let mut out = Vec::with_capacity(n.min(self.elements));
        'outer: for offset in 0..self.buckets.len() {
            let idx = (start + offset) % self.buckets.len();
            for slot in &self.buckets[idx] {
                if let Some(entry) = slot {
                    out.push(entry.clone());
                    if out.len() >= n {
                        break 'outer;
                    }
                }
            }
        }
        out
    }

    fn maybe_grow(&mut self) {
        if self.elements < MIN_ELEMENTS_BEFORE_RESIZE {
            return;
        }
        if self.elements >= GROW_LOAD_FACTOR * self.buckets.len() {
            let new_size = ((self.buckets.len() as f64) * GROW_FACTOR) as usize;
            self.resize(new_size.max(self.buckets.len() + 1));
        }
    }

    fn maybe_shrink(&mut self) {
        if self.elements < MIN_ELEMENTS_BEFORE_RESIZE {
            return;
        }
        if self.buckets.len() > INITIAL_BUCKET_COUNT && SHRINK_LOAD_FACTOR * self.elements < self.buckets.len() {
            let new_size = ((self.buckets.len() as f64) * SHRINK_FACTOR) as usize;
            self.resize(new_size.max(INITIAL_BUCKET_COUNT));
        }
    }

    fn resize(&mut self, new_size: usize) {
        if new_size == self.buckets.len() || new_size < INITIAL_BUCKET_COUNT {
            return;
        }
        let mut new_buckets: Vec<Vec<Option<HashEntry>>> = vec![Vec::new(); new_size];
        for bucket in self.buckets.drain(..) {
            for entry in bucket.into_iter().flatten() {
                let idx = (entry.hash as usize) % new_size;
                new_buckets[idx].push(Some(entry));
            }
        }
        self.buckets = new_buckets;
    }
}

impl Default for SamplingHashTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TraceRecord;

    fn dummy_record(block_id: u64) -> TraceRecord {
        TraceRecord {
            access_time_us: 0,
            block_id,
            block_type: 0,
            block_size: 16,
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
    fn insert_then_lookup_roundtrips() {
        let mut t = SamplingHashTable::new();
        let r = dummy_record(1);
        t.insert("b1".into(), 1, CacheEntry::new(16, &r, 0));
        assert_eq!(t.lookup("b1", 1).unwrap().value_size, 16);
        assert!(t.lookup("b2", 2).is_none());
    }

    #[test]
    fn delete_removes_entry_and_decrements_count() {
        let mut t = SamplingHashTable::new();
        let r = dummy_record(1);
        t.insert("b1".into(), 1, CacheEntry::new(16, &r, 0));
        assert_eq!(t.len(), 1);
        let removed = t.delete("b1", 1).unwrap();
        assert_eq!(removed.key, "b1");
        assert_eq!(t.len(), 0);
        assert!(t.delete("b1", 1).is_none());
    }

    #[test]
    fn random_sample_never_exceeds_population_or_request() {
        use rand::SeedableRng;
        let mut t = SamplingHashTable::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for i in 0..10u64 {
            let r = dummy_record(i);
            t.insert(format!("b{i}"), i, CacheEntry::new(16, &r, 0));
        }
        let sample = t.random_sample(4, &mut rng);
        assert!(sample.len() <= 4);
        let sample_all = t.random_sample(1000, &mut rng);
        assert_eq!(sample_all.len(), 10);
    }

    #[test]
    fn grows_past_load_factor_threshold() {
        let mut t = SamplingHashTable::new();
        for i in 0..200u64 {
            let r = dummy_record(i);
            t.insert(format!("b{i}"), i, CacheEntry::new(16, &r, 0));
        }
        assert!(t.buckets.len() > INITIAL_BUCKET_COUNT);
        assert_eq!(t.len(), 200);
    }
}
