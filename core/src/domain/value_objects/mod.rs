//! Value objects representing immutable domain concepts.

pub mod cache_key;

// Re-export commonly used types
pub use cache_key::{CacheKey, CredentialKind};
