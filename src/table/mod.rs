pub mod priority_table;
pub mod recency_deque;
pub mod sampling_hash_table;

pub use priority_table::{Direction, PriorityTable};
pub use recency_deque::RecencyDeque;
pub use sampling_hash_table::SamplingHashTable;
