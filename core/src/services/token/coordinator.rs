//! Cache-aside refresh flow shared by the app and user token managers

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use tk_shared::config::TokenConfig;

use crate::domain::entities::TokenRecord;
use crate::domain::value_objects::CacheKey;
use crate::errors::{IssuerError, TokenError, TokenResult};
use crate::repositories::{CacheStore, StoreTier};
use crate::services::lease::{Lease, LeaseOutcome};

pub(crate) struct RefreshCoordinator {
    store: Arc<dyn CacheStore>,
    lease: Lease,
    config: TokenConfig,
}

impl RefreshCoordinator {
    pub(crate) fn new(store: Arc<dyn CacheStore>, config: TokenConfig) -> Self {
        let lease = Lease::new(store.clone(), config.lease.clone());
        Self {
            store,
            lease,
            config,
        }
    }

    pub(crate) fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub(crate) fn buffer(&self) -> chrono::Duration {
        i64::try_from(self.config.buffer_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Read and decode a record; an undecodable record counts as a miss
    pub(crate) async fn load<R: TokenRecord>(&self, key: &CacheKey) -> Option<R> {
        let raw = self.store.get(key.as_str()).await?;
        match serde_json::from_str::<R>(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable token record");
                None
            }
        }
    }

    /// Read a record only if it can be served right now
    pub(crate) async fn load_usable<R: TokenRecord>(&self, key: &CacheKey) -> Option<R> {
        let buffer = self.buffer();
        self.load::<R>(key)
            .await
            .filter(|record| record.is_usable_at(Utc::now(), buffer))
    }

    /// Write a record as one JSON document
    pub(crate) async fn save<R: TokenRecord>(
        &self,
        key: &CacheKey,
        record: &R,
        ttl: Duration,
    ) -> TokenResult<StoreTier> {
        let payload = serde_json::to_string(record).map_err(|e| TokenError::Internal {
            message: format!("failed to encode token record: {}", e),
        })?;
        let tier = self.store.set(key.as_str(), &payload, ttl).await;
        debug!(key = %key, ttl_secs = ttl.as_secs(), tier = ?tier, "Token record stored");
        Ok(tier)
    }

    /// Run an issuer call under the configured timeout
    pub(crate) async fn call_issuer<T, Fut>(&self, call: Fut) -> Result<T, IssuerError>
    where
        Fut: Future<Output = Result<T, IssuerError>>,
    {
        let timeout = self.config.issuer_timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(IssuerError::unavailable(format!(
                "no response within {}s",
                timeout.as_secs()
            ))),
        }
    }

    /// Reject lifetimes that could never produce a servable token
    pub(crate) fn check_lifetime(&self, lifetime_seconds: u64) -> TokenResult<()> {
        if lifetime_seconds <= self.config.buffer_seconds {
            return Err(TokenError::LifetimeTooShort {
                lifetime_seconds,
                buffer_seconds: self.config.buffer_seconds,
            });
        }
        Ok(())
    }

    /// Return a usable record for `key`, refreshing it under the lease if needed
    ///
    /// `refresh` receives the record as seen inside the lease (possibly stale or
    /// absent) and is responsible for persisting the replacement. It only runs
    /// while this caller holds the lease.
    pub(crate) async fn get_or_refresh<R, F, Fut>(&self, key: &CacheKey, refresh: F) -> TokenResult<R>
    where
        R: TokenRecord,
        F: FnOnce(Option<R>) -> Fut,
        Fut: Future<Output = TokenResult<R>>,
    {
        if let Some(record) = self.load_usable::<R>(key).await {
            return Ok(record);
        }

        match self.lease.acquire(key, || self.load_usable::<R>(key)).await {
            LeaseOutcome::Acquired(guard) => {
                let current = self.load::<R>(key).await;
                let buffer = self.buffer();
                let result = match current {
                    Some(record) if record.is_usable_at(Utc::now(), buffer) => {
                        debug!(key = %key, "Record refreshed by another holder");
                        Ok(record)
                    }
                    current => refresh(current).await,
                };
                guard.release().await;
                result
            }
            LeaseOutcome::Resolved(record) => Ok(record),
            LeaseOutcome::TimedOut { waited, .. } => self.after_timeout(key, waited).await,
        }
    }

    async fn after_timeout<R: TokenRecord>(&self, key: &CacheKey, waited: Duration) -> TokenResult<R> {
        let now = Utc::now();
        if let Some(record) = self.load::<R>(key).await {
            if record.is_usable_at(now, self.buffer()) {
                return Ok(record);
            }
            if self.config.lease.serve_stale_on_timeout && !record.is_expired_at(now) {
                warn!(
                    key = %key,
                    remaining_secs = (record.expires_at() - now).num_seconds(),
                    "Serving token inside its buffer window after lease timeout"
                );
                return Ok(record);
            }
        }
        Err(TokenError::LeaseContention {
            key: key.to_string(),
            waited_ms: waited.as_millis() as u64,
        })
    }
}
