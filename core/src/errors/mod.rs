//! Domain-specific error types and error handling.

mod types;


// Re-export all error types and utilities
pub use types::{IssuerError, TokenError};

pub type TokenResult<T> = Result<T, TokenError>;
