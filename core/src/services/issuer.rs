//! Contract for the external authority that mints and rotates credentials

use async_trait::async_trait;

use crate::errors::IssuerError;

/// Application token granted by the issuer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedAppToken {
    pub token: String,
    /// Lifetime in seconds, counted from the moment of issue
    pub lifetime_seconds: u64,
}

/// User token pair granted by a refresh
///
/// `refresh_token` replaces the one presented; the old one is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedUserToken {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds
    pub lifetime_seconds: u64,
}

/// Credential issuer client
///
/// Implementations map transport failures to [`IssuerError::Unavailable`] and
/// a refused refresh secret to [`IssuerError::RefreshTokenInvalid`]. Callers
/// apply their own timeout; implementations should not retry.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    /// Mint an application-scoped token
    async fn fetch_app_token(
        &self,
        app_id: &str,
        app_secret: &str,
    ) -> Result<IssuedAppToken, IssuerError>;

    /// Exchange a refresh token for a new access token and a new refresh token
    async fn refresh_user_token(
        &self,
        app_id: &str,
        app_secret: &str,
        refresh_token: &str,
    ) -> Result<IssuedUserToken, IssuerError>;
}
