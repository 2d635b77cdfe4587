pub mod index;
pub mod recency_list;
pub mod slot_pool;

pub use index::FingerprintIndex;
pub use recency_list::{RecencyIter, RecencyList};
pub use slot_pool::{SlotId, SlotPool};
