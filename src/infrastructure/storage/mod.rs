pub mod memory;

pub use memory::{MemoryStorage, StorageError, DEFAULT_MAX_SESSIONS};
