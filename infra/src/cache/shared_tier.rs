//! Contract for the networked tier of the tiered cache store

use async_trait::async_trait;
use std::time::Duration;

use crate::InfrastructureError;

/// Value read from the shared tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedEntry {
    pub value: String,
    /// Remaining time to live; `None` for keys without an expiry
    pub ttl: Option<Duration>,
}

/// Cache tier shared by every process, e.g. Redis
///
/// Unlike [`CacheStore`](tk_core::repositories::CacheStore), failures are
/// reported so the tiered store can fall back.
#[async_trait]
pub trait SharedCacheTier: Send + Sync {
    /// Read a value together with its remaining TTL
    async fn get(&self, key: &str) -> Result<Option<SharedEntry>, InfrastructureError>;

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), InfrastructureError>;

    /// Atomic create-if-absent; `true` when this call created the key
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, InfrastructureError>;

    async fn delete(&self, key: &str) -> Result<(), InfrastructureError>;
}
