pub mod gap_store;
pub mod lock;
pub mod patterns;
pub mod progress;

pub use gap_store::MemoryGapStore;
pub use lock::MemoryDistributedLock;
pub use patterns::MemoryPatternStore;
pub use progress::MemoryProgressChannel;
