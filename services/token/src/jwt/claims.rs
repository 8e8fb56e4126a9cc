//! Access token claims.

use crate::error::TokenError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Issuer written into every access token.
pub const ISSUER: &str = "token-rotation";

/// Wire claim set of an access token.
///
/// Every field is required; serde rejects a token missing any of them or
/// carrying one with the wrong JSON type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Issuer
    pub iss: String,
    /// Subject user id
    pub user_id: i64,
    /// Origin address at issue time
    pub ip: String,
    /// Binding key shared with the refresh token
    pub matching_key: String,
    /// Issued at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

impl AccessClaims {
    /// Claims for a token issued at `issued_at`, valid for `ttl`.
    pub fn new(
        user_id: i64,
        origin_addr: &str,
        binding_key: &str,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        AccessClaims {
            iss: ISSUER.to_string(),
            user_id,
            ip: origin_addr.to_string(),
            matching_key: binding_key.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }
}

/// Verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Issuer claim
    pub issuer: String,
    /// Subject user id
    pub user_id: i64,
    /// Origin the token was issued to
    pub origin_addr: String,
    /// Binding key of the paired refresh token
    pub binding_key: String,
    /// Issue time
    pub issued_at: DateTime<Utc>,
    /// Expiry without leeway
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether the token is past `exp` by more than `leeway` at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        now > self.expires_at + leeway
    }
}

impl TryFrom<AccessClaims> for AccessToken {
    type Error = TokenError;

    fn try_from(claims: AccessClaims) -> Result<Self, Self::Error> {
        let issued_at = DateTime::from_timestamp(claims.iat, 0)
            .ok_or_else(|| TokenError::malformed("iat out of range"))?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| TokenError::malformed("exp out of range"))?;

        Ok(AccessToken {
            issuer: claims.iss,
            user_id: claims.user_id,
            origin_addr: claims.ip,
            binding_key: claims.matching_key,
            issued_at,
            expires_at,
        })
    }
}
