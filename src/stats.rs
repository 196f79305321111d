//! Time-bucketed miss-ratio and sub-policy-selection statistics, aggregated
//! at whatever granularity the caller asks for (minute or hour buckets are
//! what the driver uses, but the bucket width is just a parameter).

use std::collections::HashMap;

use crate::error::Error;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// The external collaborator that turns a cache's stats snapshots into
/// whatever on-disk (or otherwise observable) shape a caller wants. The
/// simulator core only produces the numbers; it never opens a file itself.
/// `src/bin/simulate.rs` implements this once as `FileReporter`, writing the
/// eight `data-ml-*`/`header-ml-*` files the driver surface documents.
pub trait Reporter {
    fn write_mrc(&mut self, cache_type: &str, cache_size: u64, cf: &str, miss_ratio: f64, accesses: u64) -> Result<(), Error>;

    fn write_miss_timeline(
        &mut self,
        cache_type: &str,
        cache_size: u64,
        cf: &str,
        time_unit_secs: i64,
        start_bucket: i64,
        timeline: &[u64],
    ) -> Result<(), Error>;

    fn write_miss_ratio_timeline(
        &mut self,
        cache_type: &str,
        cache_size: u64,
        cf: &str,
        time_unit_secs: i64,
        start_bucket: i64,
        timeline: &[f64],
    ) -> Result<(), Error>;

    fn write_policy_timeline(
        &mut self,
        cache_type: &str,
        cache_size: u64,
        cf: &str,
        time_unit_secs: i64,
        start_bucket: i64,
        policy_names: &[&str],
        timelines: &[Vec<u64>],
    ) -> Result<(), Error>;

    fn write_policy_ratio_timeline(
        &mut self,
        cache_type: &str,
        cache_size: u64,
        cf: &str,
        time_unit_secs: i64,
        start_bucket: i64,
        policy_names: &[&str],
        timelines: &[Vec<f64>],
    ) -> Result<(), Error>;
}

/// Running and time-bucketed hit/miss counters for one cache.
pub struct MissRatioStats {
    time_unit_secs: i64,
    num_accesses: u64,
    num_misses: u64,
    time_accesses: HashMap<i64, u64>,
    time_misses: HashMap<i64, u64>,
}

impl MissRatioStats {
    pub fn new(time_unit_secs: i64) -> Self {
        MissRatioStats {
            time_unit_secs,
            num_accesses: 0,
            num_misses: 0,
            time_accesses: HashMap::new(),
            time_misses: HashMap::new(),
        }
    }

    fn bucket(&self, access_time_us: i64) -> i64 {
        access_time_us / (MICROS_PER_SECOND * self.time_unit_secs)
    }

    pub fn update(&mut self, access_time_us: i64, is_hit: bool) {
        let bucket = self.bucket(access_time_us);
        self.num_accesses += 1;
        *self.time_accesses.entry(bucket).or_insert(0) += 1;
        if !is_hit {
            self.num_misses += 1;
            *self.time_misses.entry(bucket).or_insert(0) += 1;
        }
    }

    /// Zeroes the running totals without touching the timeline, matching
    /// the driver's warmup behavior: reported miss ratios exclude the
    /// warmup period, but the per-bucket timeline still covers it.
    pub fn reset_counters(&mut self) {
        self.num_accesses = 0;
        self.num_misses = 0;
    }

    pub fn num_accesses(&self) -> u64 {
        self.num_accesses
    }

    pub fn num_misses(&self) -> u64 {
        self.num_misses
    }

    pub fn miss_ratio(&self) -> f64 {
        if self.num_accesses == 0 {
            0.0
        } else {
            100.0 * self.num_misses as f64 / self.num_accesses as f64
        }
    }

    fn bucket_range(&self, start_us: i64, end_us: i64) -> std::ops::RangeInclusive<i64> {
        self.bucket(start_us)..=self.bucket(end_us)
    }

    pub fn access_timeline(&self, start_us: i64, end_us: i64) -> Vec<u64> {
        self.bucket_range(start_us, end_us)
            .map(|b| *self.time_accesses.get(&b).unwrap_or(&0))
            .collect()
    }

    pub fn miss_timeline(&self, start_us: i64, end_us: i64) -> Vec<u64> {
        self.bucket_range(start_us, end_us)
            .map(|b| *self.time_misses.get(&b).unwrap_or(&0))
            .collect()
    }

    pub fn miss_ratio_timeline(&self, start_us: i64, end_us: i64) -> Vec<f64> {
        self.bucket_range(start_us, end_us)
            .map(|b| {
                let accesses = *self.time_accesses.get(&b).unwrap_or(&0);
                let misses = *self.time_misses.get(&b).unwrap_or(&0);
                if accesses == 0 {
                    0.0
                } else {
                    100.0 * misses as f64 / accesses as f64
                }
            })
            .collect()
    }
}

/// Per-bucket counts of how often each sub-policy was selected by a
/// sample-based cache's bandit, so a reporter can chart policy churn over
/// time alongside the miss ratio.
pub struct PolicyStats {
    time_unit_secs: i64,
    policy_names: Vec<&'static str>,
    time_selected: HashMap<i64, Vec<u64>>,
}

impl PolicyStats {
    pub fn new(time_unit_secs: i64, policy_names: Vec<&'static str>) -> Self {
        PolicyStats {
            time_unit_secs,
            policy_names,
            time_selected: HashMap::new(),
        }
    }

    fn bucket(&self, access_time_us: i64) -> i64 {
        access_time_us / (MICROS_PER_SECOND * self.time_unit_secs)
    }

    pub fn update(&mut self, access_time_us: i64, policy_index: usize) {
        let bucket = self.bucket(access_time_us);
        let counts = self
            .time_selected
            .entry(bucket)
            .or_insert_with(|| vec![0u64; self.policy_names.len()]);
        counts[policy_index] += 1;
    }

    pub fn policy_names(&self) -> &[&'static str] {
        &self.policy_names
    }

    pub fn policy_timeline(&self, policy_index: usize, start_us: i64, end_us: i64) -> Vec<u64> {
        let range = self.bucket(start_us)..=self.bucket(end_us);
        range
            .map(|b| self.time_selected.get(&b).map(|c| c[policy_index]).unwrap_or(0))
            .collect()
    }

    /// Share of a bucket's total selections (across every sub-policy) that
    /// went to `policy_index`, as a percentage; `0.0` for buckets with no
    /// selections at all.
    pub fn policy_ratio_timeline(&self, policy_index: usize, start_us: i64, end_us: i64) -> Vec<f64> {
        let range = self.bucket(start_us)..=self.bucket(end_us);
        range
            .map(|b| match self.time_selected.get(&b) {
                Some(counts) => {
                    let total: u64 = counts.iter().sum();
                    if total == 0 {
                        0.0
                    } else {
                        100.0 * counts[policy_index] as f64 / total as f64
                    }
                }
                None => 0.0,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_ratio_tracks_hits_and_misses() {
        let mut stats = MissRatioStats::new(60);
        stats.update(0, true);
        stats.update(0, false);
        stats.update(0, false);
        assert_eq!(stats.num_accesses(), 3);
        assert_eq!(stats.num_misses(), 2);
        assert!((stats.miss_ratio() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn reset_counters_keeps_timeline_intact() {
        let mut stats = MissRatioStats::new(60);
        stats.update(0, false);
        stats.reset_counters();
        assert_eq!(stats.num_accesses(), 0);
        assert_eq!(stats.miss_timeline(0, 0), vec![1]);
    }

    #[test]
    fn policy_stats_bins_by_selection() {
        let mut stats = PolicyStats::new(60, vec!["lru", "lfu"]);
        stats.update(0, 0);
        stats.update(0, 0);
        stats.update(0, 1);
        assert_eq!(stats.policy_timeline(0, 0, 0), vec![2]);
        assert_eq!(stats.policy_timeline(1, 0, 0), vec![1]);
    }

    #[test]
    fn policy_ratio_timeline_normalizes_to_a_percentage() {
        let mut stats = PolicyStats::new(60, vec!["lru", "lfu"]);
        stats.update(0, 0);
        stats.update(0, 0);
        stats.update(0, 1);
        assert!((stats.policy_ratio_timeline(0, 0, 0)[0] - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.policy_ratio_timeline(0, 60_000_000, 60_000_000), vec![0.0]);
    }
}
