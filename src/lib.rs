#![warn(clippy::all)]
#![warn(rust_2018_idioms)]

//! `blockcache-sim` is a trace-driven block-cache replacement-policy
//! simulator. It replays a recorded sequence of block accesses against a
//! configurable in-memory cache and measures miss behavior over time,
//! comparing classical replacement policies (LRU, ARC, GreedyDual-Size, the
//! Belady/OPT oracle) against two reinforcement-learning meta-policies
//! (Thompson Sampling and LinUCB) that pick among LRU/LFU/Hyperbolic
//! sub-policies on a per-eviction basis.
//!
//! # Scope
//!
//! This crate is the core: the replacement-policy engines and the data
//! structures that make them efficient ([`table::SamplingHashTable`],
//! [`table::PriorityTable`], [`table::RecencyDeque`]), plus the
//! [`simulator::Simulator`] driver loop. Trace-file parsing beyond the
//! documented CSV format, CLI argument handling, and report-file layout are
//! left to a caller; see `src/bin/simulate.rs` for a complete driver built
//! on top of this library.
//!
//! This is not a production cache: it is single-threaded, keeps no state
//! across runs, and implements no cross-instance coherence.
//!
//! # Example
//!
//! ```
//! use blockcache_sim::cache::create_cache;
//! use blockcache_sim::record::TraceRecord;
//! use blockcache_sim::Cache;
//!
//! let mut cache = create_cache("lru", 1024, 1, 0).unwrap();
//! let record = TraceRecord {
//!     access_time_us: 0,
//!     block_id: 7,
//!     block_type: 0,
//!     block_size: 16,
//!     cf_id: 0,
//!     cf_name: "default".to_string(),
//!     level: 0,
//!     fd: 0,
//!     caller: 0,
//!     no_insert: false,
//!     get_id: 0,
//!     key_id: 0,
//!     kv_size: 0,
//!     is_hit_observed: false,
//!     next_access_seq_no: 0,
//! };
//! cache.access(&record);
//! assert_eq!(cache.miss_ratio_stats().num_misses(), 1);
//! ```

pub mod cache;
pub mod error;
pub mod policy;
pub mod record;
pub mod simulator;
pub mod size;
pub mod stats;
pub mod table;

pub use cache::{create_cache, Cache};
pub use error::{Error, Result};
