//! Refresh token minting, parsing and hashing.

pub mod generator;
pub mod hash;
pub mod token;

pub use generator::{random_alphanumeric, RefreshTokenGenerator};
pub use hash::{compare_refresh_hash, fingerprint, hash_refresh_token};
pub use token::{split_refresh_token, PresentedRefreshToken, RefreshToken};
