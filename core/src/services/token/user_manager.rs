//! User-scoped token manager with refresh-token rotation

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use tk_shared::config::{CredentialsConfig, TokenConfig};
use tk_shared::utils::mask_secret;

use crate::domain::entities::{TokenRecord, TokenStatus, UserTokenRecord};
use crate::domain::value_objects::CacheKey;
use crate::errors::{IssuerError, TokenError, TokenResult};
use crate::repositories::CacheStore;
use crate::services::issuer::CredentialIssuer;

use super::coordinator::RefreshCoordinator;

/// Serves per-user access tokens, rotating the refresh token on every refresh
///
/// Each refresh consumes the stored refresh token, so refreshes for one user
/// are serialized by the lease and the new pair is stored as one document
/// before the lease is released.
pub struct UserTokenManager {
    credentials: CredentialsConfig,
    issuer: Arc<dyn CredentialIssuer>,
    coordinator: RefreshCoordinator,
}

impl UserTokenManager {
    pub fn new(
        credentials: CredentialsConfig,
        store: Arc<dyn CacheStore>,
        issuer: Arc<dyn CredentialIssuer>,
        config: TokenConfig,
    ) -> Self {
        Self {
            credentials,
            issuer,
            coordinator: RefreshCoordinator::new(store, config),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.credentials.app_id
    }

    fn key(&self, user_id: &str) -> CacheKey {
        CacheKey::user(&self.credentials.app_id, user_id)
    }

    /// Return a usable access token for `user_id`
    ///
    /// # Errors
    ///
    /// * `ReauthorizationRequired` - no refresh token on record, or the issuer refused it
    /// * `IssuerUnavailable` / `IssuerRejected` - the refresh call failed
    /// * `LifetimeTooShort` - the new pair was stored but its lifetime is within the buffer
    /// * `LeaseContention` - another refresh held the lease past the wait bound
    pub async fn get_token(&self, user_id: &str) -> TokenResult<String> {
        if user_id.trim().is_empty() {
            return Err(TokenError::invalid_input("user_id"));
        }
        let key = self.key(user_id);
        let record = self
            .coordinator
            .get_or_refresh::<UserTokenRecord, _, _>(&key, |current| {
                self.refresh(user_id, &key, current)
            })
            .await?;
        Ok(record.access_token)
    }

    /// Store a token pair obtained from an interactive authorization
    ///
    /// Overwrites any existing record without taking the lease.
    pub async fn save_initial_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        lifetime_seconds: u64,
    ) -> TokenResult<()> {
        if user_id.trim().is_empty() {
            return Err(TokenError::invalid_input("user_id"));
        }
        if access_token.is_empty() {
            return Err(TokenError::invalid_input("access_token"));
        }
        if refresh_token.is_empty() {
            return Err(TokenError::invalid_input("refresh_token"));
        }
        if lifetime_seconds == 0 {
            return Err(TokenError::invalid_input("lifetime_seconds"));
        }

        let key = self.key(user_id);
        let record = UserTokenRecord::issued_at(
            access_token.to_string(),
            refresh_token.to_string(),
            lifetime_seconds,
            Utc::now(),
        )
        .ok_or_else(|| TokenError::invalid_input("lifetime_seconds"))?;
        let tier = self
            .coordinator
            .save(&key, &record, self.coordinator.config().user_record_ttl())
            .await?;

        info!(
            user_id = %user_id,
            access_token = %mask_secret(access_token),
            expires_at = %record.expires_at,
            tier = ?tier,
            "Initial user tokens saved"
        );
        Ok(())
    }

    /// Snapshot of the cached access token without contacting the issuer
    pub async fn token_status(&self, user_id: &str) -> Option<TokenStatus> {
        let record = self
            .coordinator
            .load::<UserTokenRecord>(&self.key(user_id))
            .await?;
        Some(record.status_at(Utc::now(), self.coordinator.buffer()))
    }

    async fn refresh(
        &self,
        user_id: &str,
        key: &CacheKey,
        current: Option<UserTokenRecord>,
    ) -> TokenResult<UserTokenRecord> {
        let refresh_token = match current {
            Some(record) if record.has_refresh_token() => record.refresh_token,
            _ => {
                info!(user_id = %user_id, "No refresh token on record");
                return Err(TokenError::ReauthorizationRequired {
                    user_id: user_id.to_string(),
                });
            }
        };

        let requested_at = Utc::now();
        let issued = match self
            .coordinator
            .call_issuer(self.issuer.refresh_user_token(
                &self.credentials.app_id,
                &self.credentials.app_secret,
                &refresh_token,
            ))
            .await
        {
            Ok(issued) => issued,
            Err(IssuerError::RefreshTokenInvalid { code, message }) => {
                warn!(user_id = %user_id, code, message = %message, "Refresh token refused");
                return Err(TokenError::ReauthorizationRequired {
                    user_id: user_id.to_string(),
                });
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "User token refresh failed");
                return Err(e.into());
            }
        };

        if issued.access_token.is_empty() || issued.refresh_token.is_empty() {
            // The old refresh token is already consumed; storing half a pair would lose the user.
            return Err(TokenError::IssuerRejected {
                code: 0,
                message: "issuer returned an incomplete token pair".to_string(),
            });
        }

        let lifetime_seconds = issued.lifetime_seconds;
        let record = UserTokenRecord::issued_at(
            issued.access_token,
            issued.refresh_token,
            lifetime_seconds,
            requested_at,
        )
        .ok_or_else(|| TokenError::IssuerRejected {
            code: 0,
            message: format!("issuer reported an out-of-range lifetime of {}s", lifetime_seconds),
        })?;
        let tier = self
            .coordinator
            .save(key, &record, self.coordinator.config().user_record_ttl())
            .await?;
        if !tier.is_shared() {
            warn!(
                user_id = %user_id,
                "Rotated tokens stored in the local tier only; other processes still see the consumed refresh token"
            );
        }

        // Persisted first: the rotated refresh token is the only valid one now.
        self.coordinator.check_lifetime(lifetime_seconds)?;

        info!(
            user_id = %user_id,
            access_token = %mask_secret(&record.access_token),
            expires_at = %record.expires_at,
            "User token refreshed"
        );
        Ok(record)
    }
}
