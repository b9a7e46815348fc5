//! Application-scoped token manager

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use tk_shared::config::{CredentialsConfig, TokenConfig};
use tk_shared::utils::mask_secret;

use crate::domain::entities::{AppTokenRecord, TokenRecord, TokenStatus};
use crate::domain::value_objects::CacheKey;
use crate::errors::{TokenError, TokenResult};
use crate::repositories::CacheStore;
use crate::services::issuer::CredentialIssuer;

use super::coordinator::RefreshCoordinator;

/// Serves the application token, minting a new one only on miss or near-expiry
///
/// Cheap to share: wrap in an `Arc` and call from any number of tasks. Managers
/// in different processes coordinate through the shared cache tier.
pub struct AppTokenManager {
    credentials: CredentialsConfig,
    key: CacheKey,
    issuer: Arc<dyn CredentialIssuer>,
    coordinator: RefreshCoordinator,
}

impl AppTokenManager {
    pub fn new(
        credentials: CredentialsConfig,
        store: Arc<dyn CacheStore>,
        issuer: Arc<dyn CredentialIssuer>,
        config: TokenConfig,
    ) -> Self {
        let key = CacheKey::app(&credentials.app_id);
        Self {
            credentials,
            key,
            issuer,
            coordinator: RefreshCoordinator::new(store, config),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.credentials.app_id
    }

    pub fn config(&self) -> &TokenConfig {
        self.coordinator.config()
    }

    /// Return a token valid for at least the buffer window
    ///
    /// # Errors
    ///
    /// * `IssuerUnavailable` / `IssuerRejected` - the issuer call failed
    /// * `LifetimeTooShort` - the issuer granted a lifetime within the buffer
    /// * `LeaseContention` - another refresh held the lease past the wait bound
    pub async fn get_token(&self) -> TokenResult<String> {
        let record = self
            .coordinator
            .get_or_refresh::<AppTokenRecord, _, _>(&self.key, |_| self.fetch())
            .await?;
        Ok(record.value)
    }

    /// Snapshot of the cached token without contacting the issuer
    pub async fn token_status(&self) -> Option<TokenStatus> {
        let record = self.coordinator.load::<AppTokenRecord>(&self.key).await?;
        Some(record.status_at(Utc::now(), self.coordinator.buffer()))
    }

    async fn fetch(&self) -> TokenResult<AppTokenRecord> {
        let requested_at = Utc::now();
        let issued = self
            .coordinator
            .call_issuer(
                self.issuer
                    .fetch_app_token(&self.credentials.app_id, &self.credentials.app_secret),
            )
            .await
            .map_err(|e| {
                warn!(app_id = %self.credentials.app_id, error = %e, "App token fetch failed");
                TokenError::from(e)
            })?;

        if issued.token.is_empty() {
            return Err(TokenError::IssuerRejected {
                code: 0,
                message: "issuer returned an empty app token".to_string(),
            });
        }
        self.coordinator.check_lifetime(issued.lifetime_seconds)?;

        let lifetime_seconds = issued.lifetime_seconds;
        let record = AppTokenRecord::issued_at(issued.token, lifetime_seconds, requested_at)
            .ok_or_else(|| TokenError::IssuerRejected {
                code: 0,
                message: format!("issuer reported an out-of-range lifetime of {}s", lifetime_seconds),
            })?;
        let tier = self
            .coordinator
            .save(&self.key, &record, Duration::from_secs(lifetime_seconds))
            .await?;

        info!(
            app_id = %self.credentials.app_id,
            token = %mask_secret(&record.value),
            expires_at = %record.expires_at,
            tier = ?tier,
            "App token refreshed"
        );
        Ok(record)
    }
}
