//! # Storage Module
//!
//! Handles all data persistence for the attendance tracker.
//!
//! Data lives in a string-keyed key-value backend as two JSON arrays:
//!
//! - `classes`: every [`ClassRoom`](shared::ClassRoom) with its roster
//! - `attendance`: every [`AttendanceRecord`](shared::AttendanceRecord)
//!
//! ## Layers
//!
//! - **Backends** ([`backends`]): files on disk, a SQLite table, or memory,
//!   all behind [`KeyValueBackend`]
//! - **Store** ([`JsonStore`]): collection keys, JSON encoding, writer locks
//! - **Repository** ([`Repository`]): typed CRUD and the cascading delete

pub mod backends;
pub mod error;
pub mod repository;
pub mod store;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_utils;

pub use backends::{FileBackend, MemoryBackend, SqliteBackend};
pub use error::{BackendError, Entity, RepositoryError, StoreError};
pub use repository::Repository;
pub use store::{Collection, JsonStore};
pub use traits::KeyValueBackend;
