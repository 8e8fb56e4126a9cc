//! Refresh token generation.

use crate::error::TokenError;
use crate::refresh::hash::hash_refresh_token;
use crate::refresh::token::{RefreshToken, SEPARATOR};
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

/// Draw `len` characters from `[A-Za-z0-9]` using the OS CSPRNG.
pub fn random_alphanumeric(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Mints refresh tokens with fixed part lengths and hash cost.
#[derive(Debug, Clone, Copy)]
pub struct RefreshTokenGenerator {
    secret_len: usize,
    binding_key_len: usize,
    hash_cost: u32,
}

impl RefreshTokenGenerator {
    /// Generator for tokens of the given part lengths, hashed at `hash_cost`.
    pub const fn new(secret_len: usize, binding_key_len: usize, hash_cost: u32) -> Self {
        RefreshTokenGenerator {
            secret_len,
            binding_key_len,
            hash_cost,
        }
    }

    /// Mint `{secret}.{bindingKey}` and its slow hash.
    ///
    /// Both parts are fresh on every call; nothing carries over between
    /// rotation cycles.
    pub fn mint(&self, user_id: i64, expires_at: DateTime<Utc>) -> Result<RefreshToken, TokenError> {
        let binding_key = random_alphanumeric(self.binding_key_len);
        let secret = random_alphanumeric(self.secret_len);
        let raw_value = format!("{secret}{SEPARATOR}{binding_key}");
        let hashed_value = hash_refresh_token(&raw_value, self.hash_cost)?;

        Ok(RefreshToken {
            raw_value,
            hashed_value,
            user_id,
            binding_key,
            expires_at,
        })
    }
}
