//! # TokenKeeper Core
//!
//! Domain layer for cached, lease-coordinated access tokens.
//! This crate contains the token records, the cache and issuer contracts,
//! the refresh lease and the app/user token managers built on top of them.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
