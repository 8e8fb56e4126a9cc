//! Signing and verification of access tokens.

use crate::error::TokenError;
use crate::jwt::claims::{AccessClaims, AccessToken, ISSUER};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

const ALGORITHM: Algorithm = Algorithm::HS512;

/// HMAC codec for access tokens.
///
/// Expiry is deliberately not validated here; the rotation engine applies
/// its own leeway policy.
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AccessTokenCodec {
    /// Codec signing and verifying with `signing_key`.
    pub fn new(signing_key: &[u8]) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.set_issuer(&[ISSUER]);

        AccessTokenCodec {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
            validation,
        }
    }

    /// Sign a token bound to `binding_key` and `origin_addr`.
    pub fn sign(
        &self,
        user_id: i64,
        origin_addr: &str,
        binding_key: &str,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let claims = AccessClaims::new(user_id, origin_addr, binding_key, issued_at, ttl);
        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::crypto(format!("access token signing failed: {e}")))
    }

    /// Verify the signature and decode every claim.
    pub fn parse_and_verify(&self, token: &str) -> Result<AccessToken, TokenError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map_err(classify)?;
        AccessToken::try_from(data.claims)
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
            TokenError::TokenSignatureInvalid
        }
        _ => TokenError::malformed(err.to_string()),
    }
}
