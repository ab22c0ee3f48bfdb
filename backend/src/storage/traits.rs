//! # Storage Traits
//!
//! Defines the key-value abstraction the JSON store is built on, so that
//! different persistence backends can be used interchangeably.

use async_trait::async_trait;

use super::error::BackendError;

/// A persistent mapping from string keys to string values.
///
/// Implementations must make `set` atomic per key: a reader sees either the
/// old value or the new one, never a mix. Nothing here spans more than one
/// key, so callers cannot rely on multi-key transactions.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Fetch the value stored under `key`, or `None` if the key was never written
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;
}
