//! Test support for exercising the writer locks.
//!
//! [`MemoryBackend`] never suspends, so futures racing on it run one after
//! the other and a missing lock goes unnoticed. [`YieldingBackend`] hands
//! control back to the scheduler inside every `get` and `set`, so two
//! unsynchronized read-modify-writes really do interleave.

use async_trait::async_trait;
use std::sync::Arc;

use super::backends::MemoryBackend;
use super::error::BackendError;
use super::repository::Repository;
use super::store::JsonStore;
use super::traits::KeyValueBackend;

#[derive(Default)]
pub struct YieldingBackend {
    inner: MemoryBackend,
}

#[async_trait]
impl KeyValueBackend for YieldingBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        // Read first, then yield: a racing writer sees the same stale value
        let value = self.inner.get(key).await?;
        tokio::task::yield_now().await;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        tokio::task::yield_now().await;
        self.inner.set(key, value).await
    }
}

/// Repository over a fresh [`YieldingBackend`]
pub fn yielding_repository() -> Repository {
    Repository::new(JsonStore::new(Arc::new(YieldingBackend::default())))
}
