//! Issue and refresh flows.

/// Rotation engine
pub mod engine;
/// Owner warning text
pub mod warning;

pub use engine::{IssuedTokens, RotationEngine, RotationSettings};
pub use warning::warning_message;
