//! Application credentials presented to the credential issuer

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::mask_secret;

/// Application identity used to mint app tokens and to rotate user tokens
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct CredentialsConfig {
    /// Application id issued by the credential issuer
    pub app_id: String,
    /// Application secret paired with `app_id`
    pub app_secret: String,
}

impl CredentialsConfig {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
        }
    }

    /// Create from `APP_ID` / `APP_SECRET`
    pub fn from_env() -> Self {
        Self {
            app_id: std::env::var("APP_ID").unwrap_or_default(),
            app_secret: std::env::var("APP_SECRET").unwrap_or_default(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.app_id.trim().is_empty() && !self.app_secret.trim().is_empty()
    }
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &mask_secret(&self.app_secret))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let creds = CredentialsConfig::new("cli_a1b2c3", "s3cr3t-value-that-is-long");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("cli_a1b2c3"));
        assert!(!printed.contains("s3cr3t-value-that-is-long"));
    }

    #[test]
    fn test_is_complete() {
        assert!(CredentialsConfig::new("cli_a1", "secret").is_complete());
        assert!(!CredentialsConfig::new("cli_a1", "  ").is_complete());
        assert!(!CredentialsConfig::default().is_complete());
    }
}
