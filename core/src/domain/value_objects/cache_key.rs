//! Deterministic cache keys for token records and their refresh leases

use std::fmt;

/// Prefix of the lease key guarding a token record
const LOCK_KEY_PREFIX: &str = "lock";

/// Credential kind encoded in the key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Application-scoped token
    App,
    /// User-scoped token pair
    User,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::App => "app",
            CredentialKind::User => "user",
        }
    }
}

/// Key identifying exactly one token record and one lease
///
/// Key patterns:
/// - `app:{app_id}` - application token
/// - `user:{app_id}:{user_id}` - user token pair
/// - `lock:{key}` - refresh lease for either of the above
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: CredentialKind,
    key: String,
}

impl CacheKey {
    /// Key for the application token of `app_id`
    pub fn app(app_id: &str) -> Self {
        Self {
            kind: CredentialKind::App,
            key: format!("{}:{}", CredentialKind::App.as_str(), app_id),
        }
    }

    /// Key for the token pair `user_id` granted to `app_id`
    pub fn user(app_id: &str, user_id: &str) -> Self {
        Self {
            kind: CredentialKind::User,
            key: format!("{}:{}:{}", CredentialKind::User.as_str(), app_id, user_id),
        }
    }

    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Key of the refresh lease guarding this record
    pub fn lock_key(&self) -> String {
        format!("{}:{}", LOCK_KEY_PREFIX, self.key)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
