//! Drives a [`Cache`] over an in-memory trace: optionally runs a look-ahead
//! pass to attach each record's next-access sequence number (needed by OPT),
//! then replays every record in order, resetting the running miss-ratio
//! counters once the warmup window elapses.
//!
//! Reading and parsing the trace file itself is a driver (binary) concern;
//! by the time records reach here they're already decoded.

use std::collections::HashMap;

use crate::cache::Cache;
use crate::record::{TraceRecord, NEVER_ACCESSED_AGAIN};

/// The sequence of future occurrences of one block, with a cursor that
/// advances one step every time the block is accessed again.
struct BlockAccessTimeline {
    occurrences: Vec<u64>,
    cursor: usize,
}

impl BlockAccessTimeline {
    fn new() -> Self {
        BlockAccessTimeline { occurrences: Vec::new(), cursor: 1 }
    }

    fn push(&mut self, seq_no: u64) {
        self.occurrences.push(seq_no);
    }

    /// Called once per occurrence, in occurrence order; returns the
    /// sequence number of the *next* occurrence of this block, or the
    /// "never again" sentinel once there isn't one.
    fn next_access(&mut self) -> u64 {
        let result = if self.cursor < self.occurrences.len() {
            self.occurrences[self.cursor]
        } else {
            NEVER_ACCESSED_AGAIN
        };
        self.cursor += 1;
        result
    }
}

pub struct SimulatorConfig {
    pub warmup_seconds: i64,
    pub max_accesses_to_process: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
pub struct SimulatorReport {
    pub trace_start_time_us: i64,
    pub trace_end_time_us: i64,
    pub num_accesses_processed: u64,
}

pub struct Simulator {
    config: SimulatorConfig,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Simulator { config }
    }

    /// Runs `cache` over `records` (already filtered by downsample/target-cf
    /// at the driver layer). `records` are consumed strictly in order.
    pub fn run(&self, records: &[TraceRecord], cache: &mut dyn Cache) -> SimulatorReport {
        let is_opt = cache.cache_name() == "opt";
        let next_access_seq_no = if is_opt {
            Self::compute_next_access_sequence(records)
        } else {
            vec![0u64; records.len()]
        };

        let mut trace_start_time_us = 0;
        let mut trace_end_time_us = 0;
        let mut warmup_done = false;
        let mut processed = 0u64;

        for (i, record) in records.iter().enumerate() {
            if let Some(max) = self.config.max_accesses_to_process {
                if processed >= max {
                    break;
                }
            }

            if processed == 0 {
                trace_start_time_us = record.access_time_us;
            }
            trace_end_time_us = record.access_time_us;

            if !warmup_done
                && self.config.warmup_seconds > 0
                && record.access_time_us - trace_start_time_us >= self.config.warmup_seconds * 1_000_000
            {
                cache.reset_warmup_counters();
                warmup_done = true;
            }

            if is_opt {
                let mut with_lookahead = record.clone();
                with_lookahead.next_access_seq_no = next_access_seq_no[i];
                cache.access(&with_lookahead);
            } else {
                cache.access(record);
            }

            processed += 1;
        }

        SimulatorReport {
            trace_start_time_us,
            trace_end_time_us,
            num_accesses_processed: processed,
        }
    }

    /// First pass: for every record (in trace order), figures out the
    /// sequence number of that block's next occurrence.
    fn compute_next_access_sequence(records: &[TraceRecord]) -> Vec<u64> {
        let mut timelines: HashMap<u64, BlockAccessTimeline> = HashMap::new();
        for (seq_no, record) in records.iter().enumerate() {
            timelines
                .entry(record.block_id)
                .or_insert_with(BlockAccessTimeline::new)
                .push(seq_no as u64);
        }

        let mut next = Vec::with_capacity(records.len());
        for record in records {
            let timeline = timelines.get_mut(&record.block_id).expect("built in the first pass above");
            next.push(timeline.next_access());
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;

    fn record(block_id: u64, access_time_us: i64) -> TraceRecord {
        TraceRecord {
            access_time_us,
            block_id,
            block_type: 0,
            block_size: 10,
            cf_id: 0,
            cf_name: "default".to_string(),
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
    fn next_access_sequence_skips_own_occurrence() {
        let records = vec![record(1, 0), record(2, 1), record(1, 2), record(3, 3)];
        let next = Simulator::compute_next_access_sequence(&records);
        assert_eq!(next[0], 2); // block 1's first occurrence points at index 2.
        assert_eq!(next[2], NEVER_ACCESSED_AGAIN); // block 1's second occurrence: none left.
        assert_eq!(next[1], NEVER_ACCESSED_AGAIN);
    }

    #[test]
    fn warmup_resets_running_counters_but_not_the_timeline() {
        let mut cache = create_cache("lru", 1024, 1, 0).unwrap();
        let records: Vec<TraceRecord> = (0..5).map(|i| record(i, i as i64 * 2_000_000)).collect();
        let sim = Simulator::new(SimulatorConfig {
            warmup_seconds: 5,
            max_accesses_to_process: None,
        });
        let report = sim.run(&records, cache.as_mut());
        assert_eq!(report.num_accesses_processed, 5);
        // Everything before the 5-second mark was warmup; only records at
        // t=6s and t=8s should count toward the running miss ratio.
        assert!(cache.miss_ratio_stats().num_accesses() <= 2);
    }

    #[test]
    fn max_accesses_caps_processing() {
        let mut cache = create_cache("lru", 1024, 1, 0).unwrap();
        let records: Vec<TraceRecord> = (0..10).map(|i| record(i, i as i64)).collect();
        let sim = Simulator::new(SimulatorConfig {
            warmup_seconds: 0,
            max_accesses_to_process: Some(3),
        });
        let report = sim.run(&records, cache.as_mut());
        assert_eq!(report.num_accesses_processed, 3);
    }
}
