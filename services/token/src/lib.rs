//! Token rotation service library.
//!
//! Issues access/refresh token pairs bound by a shared binding key, rotates
//! the refresh token on every use and warns the owner when a refresh arrives
//! from an unrecognized origin.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod jwt;
pub mod metrics;
pub mod notify;
pub mod refresh;
pub mod rotation;
pub mod shutdown;
pub mod storage;
pub mod telemetry;

// Re-exports for convenience
pub use config::Config;
pub use error::TokenError;
pub use rotation::{IssuedTokens, RotationEngine, RotationSettings};
