//! Concrete [`KeyValueBackend`](crate::storage::KeyValueBackend) implementations

pub mod file;
pub mod memory;
pub mod sqlite;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
