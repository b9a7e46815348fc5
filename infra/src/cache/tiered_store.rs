//! Two-tier cache store: shared Redis tier with an in-process fallback
//!
//! The shared tier is authoritative. Values read from or written to it are
//! mirrored into the local tier with the same TTL. When it fails, the store
//! marks it degraded, serves from the local tier and skips the shared tier
//! until a cool-down elapses; the first success afterwards switches back.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use tk_core::repositories::{CacheStore, StoreTier};
use tk_shared::config::CacheConfig;
use tk_shared::utils::mask_url;

use super::memory_cache::MemoryCache;
use super::redis_client::RedisClient;
use super::shared_tier::SharedCacheTier;
use crate::InfrastructureError;

/// State tracking for shared-tier failover
#[derive(Debug, Clone, Default)]
struct FailoverState {
    /// Whether the shared tier is currently bypassed
    degraded: bool,
    /// When the shared tier last failed
    last_failure: Option<Instant>,
    /// Number of consecutive shared-tier failures
    failure_count: u32,
}

/// [`CacheStore`] over a shared tier and a local fallback tier
pub struct TieredCacheStore {
    shared: Option<Arc<dyn SharedCacheTier>>,
    local: MemoryCache,
    state: Arc<RwLock<FailoverState>>,
    cooldown: Duration,
}

impl TieredCacheStore {
    /// Store backed by the given shared tier
    pub fn with_shared_tier(shared: Arc<dyn SharedCacheTier>, cooldown: Duration) -> Self {
        Self {
            shared: Some(shared),
            local: MemoryCache::new(),
            state: Arc::new(RwLock::new(FailoverState::default())),
            cooldown,
        }
    }

    /// Store without a shared tier; no cross-process coordination
    pub fn memory_only() -> Self {
        Self {
            shared: None,
            local: MemoryCache::new(),
            state: Arc::new(RwLock::new(FailoverState::default())),
            cooldown: Duration::ZERO,
        }
    }

    /// Connect to Redis, starting memory-only if it cannot be reached
    pub async fn connect(config: &CacheConfig) -> Self {
        let client = match RedisClient::new(config.clone()).await {
            Ok(client) => client,
            Err(e) => {
                warn!(
                    url = %mask_url(&config.url),
                    error = %e,
                    "Redis unreachable at startup, using in-process cache only"
                );
                return Self::memory_only();
            }
        };

        match client.health_check().await {
            Ok(true) => {
                info!(url = %mask_url(&config.url), "Shared cache tier ready");
                Self::with_shared_tier(Arc::new(client), config.failover_cooldown())
            }
            Ok(false) | Err(_) => {
                warn!(
                    url = %mask_url(&config.url),
                    "Redis health check failed at startup, using in-process cache only"
                );
                Self::memory_only()
            }
        }
    }

    pub fn has_shared_tier(&self) -> bool {
        self.shared.is_some()
    }

    /// Whether the shared tier is currently being bypassed
    pub async fn is_degraded(&self) -> bool {
        self.state.read().await.degraded
    }

    /// The fallback tier, for diagnostics
    pub fn local_tier(&self) -> &MemoryCache {
        &self.local
    }

    /// Shared tier to use for this operation, if any
    async fn shared_tier(&self) -> Option<&Arc<dyn SharedCacheTier>> {
        let shared = self.shared.as_ref()?;
        let state = self.state.read().await;

        if !state.degraded {
            return Some(shared);
        }
        match state.last_failure {
            Some(last_failure) if last_failure.elapsed() < self.cooldown => None,
            _ => Some(shared),
        }
    }

    async fn record_failure(&self, operation: &str, err: &InfrastructureError) {
        let mut state = self.state.write().await;

        state.failure_count += 1;
        state.last_failure = Some(Instant::now());

        if !state.degraded {
            error!(
                operation,
                error = %err,
                cooldown_secs = self.cooldown.as_secs(),
                "Shared cache tier failed, switching to in-process fallback"
            );
            state.degraded = true;
        } else {
            debug!(operation, error = %err, failures = state.failure_count, "Shared cache tier still failing");
        }
    }

    async fn record_success(&self) {
        if !self.state.read().await.degraded {
            return;
        }
        let mut state = self.state.write().await;
        if state.degraded {
            info!(
                failures = state.failure_count,
                "Shared cache tier recovered, switching back from fallback"
            );
        }
        *state = FailoverState::default();
    }
}

#[async_trait]
impl CacheStore for TieredCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        if let Some(shared) = self.shared_tier().await {
            match shared.get(key).await {
                Ok(Some(entry)) => {
                    self.record_success().await;
                    match entry.ttl {
                        Some(ttl) => self.local.set(key, &entry.value, ttl).await,
                        None => {
                            self.local.delete(key).await;
                        }
                    }
                    return Some(entry.value);
                }
                Ok(None) => self.record_success().await,
                Err(e) => self.record_failure("get", &e).await,
            }
        }
        self.local.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreTier {
        if let Some(shared) = self.shared_tier().await {
            match shared.set_with_ttl(key, value, ttl).await {
                Ok(()) => {
                    self.record_success().await;
                    // Local copy serves reads while the shared tier is down
                    self.local.set(key, value, ttl).await;
                    return StoreTier::Shared;
                }
                Err(e) => self.record_failure("set", &e).await,
            }
        }
        self.local.set(key, value, ttl).await;
        StoreTier::Local
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> bool {
        if let Some(shared) = self.shared_tier().await {
            match shared.set_if_absent(key, value, ttl).await {
                Ok(created) => {
                    self.record_success().await;
                    return created;
                }
                Err(e) => self.record_failure("set_if_absent", &e).await,
            }
        }
        self.local.set_if_absent(key, value, ttl).await
    }

    async fn delete(&self, key: &str) {
        if let Some(shared) = self.shared_tier().await {
            match shared.delete(key).await {
                Ok(()) => self.record_success().await,
                Err(e) => self.record_failure("delete", &e).await,
            }
        }
        self.local.delete(key).await;
    }
}
