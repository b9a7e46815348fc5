//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use tk_core::errors::IssuerError;
use tk_core::services::{CredentialIssuer, IssuedAppToken, IssuedUserToken};
use tk_infra::{InfrastructureError, SharedCacheTier, SharedEntry};
use tk_shared::config::{CredentialsConfig, TokenConfig};

pub const APP_ID: &str = "cli_integration";
pub const APP_SECRET: &str = "integration-secret-0001";

pub fn credentials() -> CredentialsConfig {
    CredentialsConfig::new(APP_ID, APP_SECRET)
}

pub fn token_config() -> TokenConfig {
    let mut config = TokenConfig::default();
    config.lease.max_wait_ms = 3_000;
    config.lease.initial_backoff_ms = 10;
    config.lease.max_backoff_ms = 100;
    config
}

/// In-memory stand-in for Redis, shared by several "processes"
///
/// `set_down(true)` makes every operation fail like an unreachable server.
#[derive(Default)]
pub struct InMemorySharedTier {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    down: AtomicBool,
}

impl InMemorySharedTier {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self, operation: &str) -> Result<(), InfrastructureError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(InfrastructureError::Timeout {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    fn live(&self, key: &str) -> Option<(String, Duration)> {
        let entries = self.entries.lock().unwrap();
        let now = Instant::now();
        entries
            .get(key)
            .filter(|(_, expires_at)| now < *expires_at)
            .map(|(value, expires_at)| (value.clone(), *expires_at - now))
    }

    /// Stored value, readable even while the tier is down
    pub fn raw(&self, key: &str) -> Option<String> {
        self.live(key).map(|(value, _)| value)
    }
}

#[async_trait]
impl SharedCacheTier for InMemorySharedTier {
    async fn get(&self, key: &str) -> Result<Option<SharedEntry>, InfrastructureError> {
        self.check("get")?;
        Ok(self.live(key).map(|(value, ttl)| SharedEntry {
            value,
            ttl: Some(ttl),
        }))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), InfrastructureError> {
        self.check("set")?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, InfrastructureError> {
        self.check("set_nx")?;
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        if entries.get(key).is_some_and(|(_, expires_at)| now < *expires_at) {
            return Ok(false);
        }
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), InfrastructureError> {
        self.check("delete")?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Issuer that counts calls and rotates refresh tokens
pub struct CountingIssuer {
    app_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    delay: Duration,
}

impl CountingIssuer {
    pub fn new(delay: Duration) -> Self {
        Self {
            app_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn app_calls(&self) -> usize {
        self.app_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialIssuer for CountingIssuer {
    async fn fetch_app_token(&self, _app_id: &str, _app_secret: &str) -> Result<IssuedAppToken, IssuerError> {
        let n = self.app_calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        Ok(IssuedAppToken {
            token: format!("t-integration-{:04}", n),
            lifetime_seconds: 7_200,
        })
    }

    async fn refresh_user_token(
        &self,
        _app_id: &str,
        _app_secret: &str,
        refresh_token: &str,
    ) -> Result<IssuedUserToken, IssuerError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        if refresh_token.is_empty() {
            return Err(IssuerError::refresh_token_invalid(20037, "refresh token missing"));
        }
        Ok(IssuedUserToken {
            access_token: format!("u-integration-{:04}", n),
            refresh_token: format!("ur-integration-{:04}", n),
            lifetime_seconds: 7_200,
        })
    }
}
