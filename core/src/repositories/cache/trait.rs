//! Cache store trait shared by the token managers and the refresh lease.

use async_trait::async_trait;
use std::time::Duration;

/// Tier that accepted a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreTier {
    /// Shared store visible to every process
    Shared,
    /// In-process fallback, visible only to this process
    Local,
}

impl StoreTier {
    pub fn is_shared(&self) -> bool {
        matches!(self, StoreTier::Shared)
    }
}

/// Key-value store with per-entry TTL
///
/// Operations never fail from the caller's point of view: an implementation
/// that loses its shared backend degrades to a local tier instead of
/// returning an error. An entry is absent once its TTL has elapsed.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a value, `None` when missing or expired
    async fn get(&self, key: &str) -> Option<String>;

    /// Write a value that expires after `ttl`, reporting where it landed
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreTier;

    /// Write a value only if the key is absent
    ///
    /// Returns `true` when this call created the entry.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> bool;

    /// Remove a value; missing keys are ignored
    async fn delete(&self, key: &str);
}
