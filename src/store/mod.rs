//! Persistence layer — record stores backing the classification caches.

pub mod cache;
pub mod json_file;
pub mod memory;
pub mod traits;

pub use cache::ClassificationCache;
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::RecordStore;
