//! Common utility functions

pub mod mask;

pub use mask::{mask_secret, mask_url};
