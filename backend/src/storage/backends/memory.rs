use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use crate::storage::error::BackendError;
use crate::storage::traits::KeyValueBackend;

/// In-process backend. Nothing survives the process.
///
/// Writes to individual keys can be made to fail, which is how the
/// repository's partial-failure paths are exercised.
#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<BTreeMap<String, String>>,
    failing_keys: Mutex<HashSet<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` of `key` fail with [`BackendError::Unavailable`]
    pub fn fail_writes_to(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(BackendError::Unavailable { key: key.to_string() });
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
