pub mod kv;
pub mod memory;
pub mod bus;
pub mod cache;

pub use kv::KvStore;
pub use memory::MemoryKvStore;
pub use bus::{EventBus, channel_activity, channel_update};
pub use cache::CacheClient;
