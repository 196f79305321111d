//! Trace records and the cache-entry bookkeeping types that sub-policies and
//! classical policies key their decisions on.

/// One line of a decoded trace file, in the documented field order:
/// `access_time_us, block_id, block_type, block_size, cf_id, cf_name,
/// level, fd, caller, no_insert, get_id, key_id, kv_size, is_hit`.
/// `next_access_seq_no` is not part of the trace format itself; it is filled
/// in by the simulator's OPT look-ahead pass before a record reaches
/// [`crate::cache::opt::OptCache`], and left at zero otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub access_time_us: i64,
    pub block_id: u64,
    pub block_type: i32,
    pub block_size: u64,
    pub cf_id: u32,
    pub cf_name: String,
    pub level: i32,
    pub fd: u64,
    pub caller: i32,
    pub no_insert: bool,
    pub get_id: u64,
    pub key_id: u64,
    pub kv_size: u64,
    pub is_hit_observed: bool,
    pub next_access_seq_no: u64,
}

/// Sentinel meaning "this block is never accessed again within the trace".
pub const NEVER_ACCESSED_AGAIN: u64 = u64::MAX;

/// Per-key bookkeeping stored alongside a cached value. Classical policies
/// that don't need per-entry statistics (OPT, GreedyDual-Size) key their
/// priority queues directly instead of carrying this around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub value_size: u64,
    pub insertion_time_us: i64,
    pub num_hits: u64,
    pub last_access_sequence: u64,
    pub last_access_time_us: i64,
    pub cf_id: u32,
    pub level: i32,
    pub block_type: i32,
}

impl CacheEntry {
    pub fn new(value_size: u64, record: &TraceRecord, access_sequence: u64) -> Self {
        CacheEntry {
            value_size,
            insertion_time_us: record.access_time_us,
            num_hits: 0,
            last_access_sequence: access_sequence,
            last_access_time_us: record.access_time_us,
            cf_id: record.cf_id,
            level: record.level,
            block_type: record.block_type,
        }
    }

    /// Returns an updated copy reflecting a hit against this entry.
    /// `insertion_time_us` and the context fields are immutable for the
    /// entry's lifetime; only the recency/frequency bookkeeping changes.
    pub fn touched(&self, record: &TraceRecord, access_sequence: u64) -> Self {
        CacheEntry {
            num_hits: self.num_hits + 1,
            last_access_sequence: access_sequence,
            last_access_time_us: record.access_time_us,
            ..*self
        }
    }
}

/// A slot in [`crate::table::sampling_hash_table::SamplingHashTable`]: the key
/// material plus the value, kept together so a random sample can be handed to
/// a sub-policy without a second lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashEntry {
    pub key: String,
    pub hash: u64,
    pub value: CacheEntry,
}

/// Synthetic cache key for the block namespace.
pub fn block_key(record: &TraceRecord) -> String {
    format!("b{}", record.block_id)
}

/// Synthetic cache key for the row (get_id/key_id) namespace used by
/// row-key coalescing.
pub fn row_key(record: &TraceRecord) -> String {
    format!("g{}", record.key_id)
}
