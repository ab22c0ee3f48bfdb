//! # JSON Store
//!
//! Maps the two logical collections onto keys of a [`KeyValueBackend`] and
//! (de)serializes them as JSON arrays. Each write replaces the whole
//! collection.
//!
//! The store also owns one async mutex per collection. Repository code holds
//! it across a read-modify-write so that two concurrent mutations of the same
//! collection cannot interleave. When both are needed they are always taken
//! classes first, then attendance.

use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use super::error::StoreError;
use super::traits::KeyValueBackend;

/// One of the two persisted top-level arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Classes,
    Attendance,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Classes => "classes",
            Collection::Attendance => "attendance",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone)]
pub struct JsonStore {
    backend: Arc<dyn KeyValueBackend>,
    key_prefix: String,
    recover_corrupt: bool,
    classes_lock: Arc<Mutex<()>>,
    attendance_lock: Arc<Mutex<()>>,
}

impl JsonStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self {
            backend,
            key_prefix: String::new(),
            recover_corrupt: false,
            classes_lock: Arc::new(Mutex::new(())),
            attendance_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Prepend `prefix` to every collection key ("@rollytics_" -> "@rollytics_classes")
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Read a collection that fails to parse as empty instead of returning
    /// [`StoreError::Corrupt`]. The corrupt value is left in place until the
    /// next write overwrites it.
    pub fn recover_corrupt_collections(mut self, recover: bool) -> Self {
        self.recover_corrupt = recover;
        self
    }

    pub fn key(&self, collection: Collection) -> String {
        format!("{}{}", self.key_prefix, collection.name())
    }

    /// Acquire the writer lock for a collection
    pub async fn lock(&self, collection: Collection) -> MutexGuard<'_, ()> {
        match collection {
            Collection::Classes => self.classes_lock.lock().await,
            Collection::Attendance => self.attendance_lock.lock().await,
        }
    }

    /// Load a whole collection. A key that was never written reads as empty.
    pub async fn read_collection<T>(&self, collection: Collection) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let key = self.key(collection);
        let raw = self
            .backend
            .get(&key)
            .await
            .map_err(|source| StoreError::Backend {
                key: key.clone(),
                source,
            })?;

        let Some(raw) = raw else {
            debug!("Collection {} is absent, reading as empty", key);
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(items) => {
                debug!("Read {} items from {}", items.len(), key);
                Ok(items)
            }
            Err(source) if self.recover_corrupt => {
                error!("Collection {} is corrupt, reading as empty: {}", key, source);
                Ok(Vec::new())
            }
            Err(source) => Err(StoreError::Corrupt { key, source }),
        }
    }

    /// Replace a whole collection
    pub async fn write_collection<T>(&self, collection: Collection, items: &[T]) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let key = self.key(collection);
        let raw = serde_json::to_string(items).map_err(|source| StoreError::Encode {
            key: key.clone(),
            source,
        })?;

        self.backend
            .set(&key, &raw)
            .await
            .map_err(|source| StoreError::Backend {
                key: key.clone(),
                source,
            })?;

        debug!("Wrote {} items to {}", items.len(), key);
        Ok(())
    }
}
