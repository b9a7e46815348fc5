//! Domain entities representing cached credentials.

pub mod record;


// Re-export commonly used types
pub use record::{
    expiry_after, is_fresh, AppTokenRecord, TokenRecord, TokenStatus, UserTokenRecord,
};
