use crate::cache::base::{Cache, CacheBase};
use crate::record::TraceRecord;
use crate::table::{Direction, PriorityTable};

/// Belady's MIN / OPT: the oracle policy that always evicts whichever cached
/// block is referenced furthest in the future (or never again). Requires
/// `record.next_access_seq_no` to already be filled in by the simulator's
/// look-ahead pass; see [`crate::simulator`].
pub struct OptCache {
    base: CacheBase,
    table: PriorityTable<u64>,
}

impl OptCache {
    pub fn new(cache_size: u64) -> Self {
        OptCache {
            base: CacheBase::new(cache_size, false),
            table: PriorityTable::new(Direction::Max),
        }
    }
}

impl Cache for OptCache {
    fn base(&self) -> &CacheBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CacheBase {
        &mut self.base
    }

    fn cache_name(&self) -> String {
        "opt".to_string()
    }

    fn lookup(&mut self, record: &TraceRecord, key: &str, _hash: u64) -> bool {
        match self.table.size_of(key) {
            Some(size) => {
                self.table.upsert(key, record.next_access_seq_no, size);
                true
            }
            None => false,
        }
    }

    fn evict(&mut self, _record: &TraceRecord, _key: &str, _hash: u64, value_size: u64) {
        while self.base.used_size + value_size > self.base.cache_size {
            let Some((_, _, size)) = self.table.pop() else { break };
            self.base.used_size -= size;
        }
    }

    fn insert(&mut self, record: &TraceRecord, key: &str, _hash: u64, value_size: u64) {
        let previous = self.table.upsert(key, record.next_access_seq_no, value_size);
        debug_assert!(previous.is_none(), "insert() must only be called for keys not already tracked");
    }

    fn should_admit(&mut self, _record: &TraceRecord, _key: &str, _hash: u64, _value_size: u64) -> bool {
        true
    }
}
