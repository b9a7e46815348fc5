//! Cached token records and the freshness rule applied to them.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use tk_shared::utils::mask_secret;

/// Checks whether a token expiring at `expires_at` may still be handed out at `now`
///
/// A token is usable only while `now < expires_at - buffer`.
pub fn is_fresh(expires_at: DateTime<Utc>, now: DateTime<Utc>, buffer: Duration) -> bool {
    expires_at
        .checked_sub_signed(buffer)
        .is_some_and(|limit| now < limit)
}

/// Expiry of a token granted at `issued_at` for `lifetime_seconds`
///
/// `None` when the result is not a representable timestamp.
pub fn expiry_after(issued_at: DateTime<Utc>, lifetime_seconds: u64) -> Option<DateTime<Utc>> {
    let seconds = i64::try_from(lifetime_seconds).ok()?;
    issued_at.checked_add_signed(Duration::try_seconds(seconds)?)
}

/// Common view over the records the token managers cache
pub trait TokenRecord: Serialize + DeserializeOwned + Send + Sync {
    /// The bearer token handed to consumers
    fn token(&self) -> &str;

    /// Absolute expiry reported by the issuer
    fn expires_at(&self) -> DateTime<Utc>;

    /// Checks if the record can be served at `now` with the given buffer
    fn is_usable_at(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        !self.token().is_empty() && is_fresh(self.expires_at(), now, buffer)
    }

    /// Checks if the issuer-reported expiry has passed
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Builds a loggable snapshot of the record
    fn status_at(&self, now: DateTime<Utc>, buffer: Duration) -> TokenStatus {
        TokenStatus {
            masked_token: mask_secret(self.token()),
            expires_at: self.expires_at(),
            remaining_seconds: (self.expires_at() - now).num_seconds(),
            is_usable: self.is_usable_at(now, buffer),
        }
    }
}

/// Application-scoped token record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppTokenRecord {
    /// App access token
    pub value: String,

    /// Timestamp when the token expires
    pub expires_at: DateTime<Utc>,
}

impl AppTokenRecord {
    /// Creates a record for a token the issuer granted at `issued_at` for `lifetime_seconds`
    ///
    /// Returns `None` if the lifetime overflows the timestamp range.
    pub fn issued_at(value: String, lifetime_seconds: u64, issued_at: DateTime<Utc>) -> Option<Self> {
        Some(Self {
            value,
            expires_at: expiry_after(issued_at, lifetime_seconds)?,
        })
    }
}

impl TokenRecord for AppTokenRecord {
    fn token(&self) -> &str {
        &self.value
    }

    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// User-scoped token record
///
/// The access token and the rotating refresh token are always stored together,
/// so a reader never observes a new access token paired with a consumed refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTokenRecord {
    /// User access token
    pub access_token: String,

    /// Refresh token to present on the next rotation
    pub refresh_token: String,

    /// Timestamp when the access token expires
    pub expires_at: DateTime<Utc>,
}

impl UserTokenRecord {
    /// Creates a record for a token pair granted at `issued_at` for `lifetime_seconds`
    pub fn issued_at(
        access_token: String,
        refresh_token: String,
        lifetime_seconds: u64,
        issued_at: DateTime<Utc>,
    ) -> Option<Self> {
        Some(Self {
            access_token,
            refresh_token,
            expires_at: expiry_after(issued_at, lifetime_seconds)?,
        })
    }

    /// Checks if a refresh token is on record
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

impl TokenRecord for UserTokenRecord {
    fn token(&self) -> &str {
        &self.access_token
    }

    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Diagnostic snapshot of a cached token, safe to log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStatus {
    /// Token with its middle masked
    pub masked_token: String,

    /// Timestamp when the token expires
    pub expires_at: DateTime<Utc>,

    /// Seconds until expiry, negative once expired
    pub remaining_seconds: i64,

    /// Whether the token would be served right now
    pub is_usable: bool,
}
