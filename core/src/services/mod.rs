//! Business services containing the token lifecycle logic.

pub mod issuer;
pub mod lease;
pub mod token;

// Re-export commonly used types
pub use issuer::{CredentialIssuer, IssuedAppToken, IssuedUserToken};
pub use lease::{Lease, LeaseGuard, LeaseOutcome};
pub use token::{AppTokenManager, UserTokenManager};
