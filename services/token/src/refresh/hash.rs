//! Slow hashing of refresh tokens and log-safe fingerprints.

use crate::error::TokenError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};

/// Hash a raw refresh token with bcrypt at `cost`.
///
/// Inputs longer than bcrypt's 72-byte limit fail instead of being
/// silently truncated.
pub fn hash_refresh_token(raw_value: &str, cost: u32) -> Result<Vec<u8>, TokenError> {
    let hashed = bcrypt::non_truncating_hash(raw_value, cost)?;
    Ok(hashed.into_bytes())
}

/// Compare a raw refresh token against a stored bcrypt hash.
///
/// A mismatch is `Ok(false)`; only an undecodable hash is an error.
pub fn compare_refresh_hash(hash: &[u8], raw_value: &str) -> Result<bool, TokenError> {
    let hash = std::str::from_utf8(hash)
        .map_err(|_| TokenError::crypto("stored refresh hash is not valid UTF-8"))?;
    Ok(bcrypt::verify(raw_value, hash)?)
}

/// Short SHA-256 fingerprint for correlating a token in logs.
pub fn fingerprint(raw_value: &str) -> String {
    let digest = Sha256::digest(raw_value.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..9])
}
