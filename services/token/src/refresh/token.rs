//! Refresh token values.

use crate::error::TokenError;
use chrono::{DateTime, Utc};
use std::fmt;
use zeroize::Zeroize;

/// Separator between the secret part and the binding key.
///
/// Never part of the alphanumeric secret alphabet, so splitting is unambiguous.
pub const SEPARATOR: char = '.';

/// Freshly minted refresh token. Only `hashed_value` is ever persisted.
#[derive(Clone)]
pub struct RefreshToken {
    /// Value handed to the client
    pub raw_value: String,
    /// bcrypt hash of `raw_value`
    pub hashed_value: Vec<u8>,
    /// Owner
    pub user_id: i64,
    /// Part after the separator
    pub binding_key: String,
    /// End of the refresh window
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshToken")
            .field("raw_value", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("binding_key", &self.binding_key)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl Drop for RefreshToken {
    fn drop(&mut self) {
        self.raw_value.zeroize();
    }
}

/// Refresh token as presented by a client, split into its parts.
#[derive(Clone, PartialEq, Eq)]
pub struct PresentedRefreshToken {
    /// Full presented value, compared against the stored hash
    pub raw_value: String,
    /// Part after the separator
    pub binding_key: String,
}

impl fmt::Debug for PresentedRefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentedRefreshToken")
            .field("raw_value", &"<redacted>")
            .field("binding_key", &self.binding_key)
            .finish()
    }
}

/// Split `{secret}.{bindingKey}`.
///
/// Exactly two non-empty alphanumeric parts are required.
pub fn split_refresh_token(raw_value: &str) -> Result<PresentedRefreshToken, TokenError> {
    let parts: Vec<&str> = raw_value.split(SEPARATOR).collect();
    if parts.len() != 2 {
        return Err(TokenError::malformed(
            "refresh token must have a secret and a binding key",
        ));
    }

    let (secret, binding_key) = (parts[0], parts[1]);
    if secret.is_empty() || binding_key.is_empty() {
        return Err(TokenError::malformed("refresh token part is empty"));
    }
    if !is_alphanumeric(secret) || !is_alphanumeric(binding_key) {
        return Err(TokenError::malformed(
            "refresh token contains characters outside its alphabet",
        ));
    }

    Ok(PresentedRefreshToken {
        raw_value: raw_value.to_string(),
        binding_key: binding_key.to_string(),
    })
}

fn is_alphanumeric(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_alphanumeric())
}
