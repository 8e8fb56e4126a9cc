//! Error taxonomy for issue and refresh flows.
//!
//! The engine returns exactly one tagged error per call. The transport
//! adapter alone decides status codes; detail strings are for server-side
//! logs and are never echoed to clients.

use crate::notify::NotifyError;
use crate::storage::StoreError;
use thiserror::Error;

/// Errors produced by the token codec and the rotation engine.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TokenError {
    /// Caller supplied a malformed identifier.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// GUID or user id is not known to the credential store.
    #[error("Unknown subject")]
    UnknownSubject,

    /// Token structure or claims are missing, mistyped or unparsable.
    #[error("Token malformed: {0}")]
    TokenMalformed(String),

    /// Access token signature did not verify.
    #[error("Token signature invalid")]
    TokenSignatureInvalid,

    /// Access and refresh tokens were minted in different rotation cycles.
    #[error("Binding key mismatch between access and refresh token")]
    BindingMismatch,

    /// Access token is past its expiry plus the allowed leeway.
    #[error("Access token expired")]
    AccessTokenExpired,

    /// Refresh slot expiry has passed.
    #[error("Refresh token expired")]
    RefreshExpired,

    /// Presented refresh token does not match the stored hash.
    #[error("Refresh token stale or reused")]
    RefreshTokenStale,

    /// Owner warning could not be delivered; rotation aborted.
    #[error("Notification failure: {0}")]
    NotificationFailure(#[from] NotifyError),

    /// Credential store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Random generation, hashing or signing failed.
    #[error("Crypto failure: {0}")]
    CryptoFailure(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TokenError {
    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates a malformed token error.
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::TokenMalformed(msg.into())
    }

    /// Creates a crypto failure.
    #[must_use]
    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::CryptoFailure(msg.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stable machine-readable code used in logs and metrics.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => INVALID_INPUT,
            Self::UnknownSubject => UNKNOWN_SUBJECT,
            Self::TokenMalformed(_) => TOKEN_MALFORMED,
            Self::TokenSignatureInvalid => TOKEN_SIGNATURE_INVALID,
            Self::BindingMismatch => BINDING_MISMATCH,
            Self::AccessTokenExpired => ACCESS_TOKEN_EXPIRED,
            Self::RefreshExpired => REFRESH_EXPIRED,
            Self::RefreshTokenStale => REFRESH_TOKEN_STALE,
            Self::NotificationFailure(_) => NOTIFICATION_FAILURE,
            Self::Store(_) => STORE_ERROR,
            Self::CryptoFailure(_) => CRYPTO_FAILURE,
            Self::Config(_) => CONFIG_ERROR,
        }
    }

    /// True for faults on our side (store, crypto, notifier, config).
    ///
    /// None of these are retried by the engine.
    #[must_use]
    pub const fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::NotificationFailure(_) | Self::Store(_) | Self::CryptoFailure(_) | Self::Config(_)
        )
    }

    /// True for failures that reject a presented credential pair.
    #[must_use]
    pub const fn is_credential_rejection(&self) -> bool {
        matches!(
            self,
            Self::UnknownSubject
                | Self::TokenMalformed(_)
                | Self::TokenSignatureInvalid
                | Self::BindingMismatch
                | Self::AccessTokenExpired
                | Self::RefreshExpired
                | Self::RefreshTokenStale
        )
    }
}

impl From<bcrypt::BcryptError> for TokenError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::CryptoFailure(err.to_string())
    }
}

// Error codes for logs and metrics
/// Malformed request input, such as a GUID that is not a UUID.
pub const INVALID_INPUT: &str = "INVALID_INPUT";
/// No user for the GUID or access token subject.
pub const UNKNOWN_SUBJECT: &str = "UNKNOWN_SUBJECT";
/// Token text does not decode.
pub const TOKEN_MALFORMED: &str = "TOKEN_MALFORMED";
/// Access token signature or algorithm rejected.
pub const TOKEN_SIGNATURE_INVALID: &str = "TOKEN_SIGNATURE_INVALID";
/// Access and refresh token come from different pairs.
pub const BINDING_MISMATCH: &str = "BINDING_MISMATCH";
/// Access token past `exp` plus leeway.
pub const ACCESS_TOKEN_EXPIRED: &str = "ACCESS_TOKEN_EXPIRED";
/// Refresh slot missing its expiry or past it.
pub const REFRESH_EXPIRED: &str = "REFRESH_EXPIRED";
/// Refresh token already rotated away.
pub const REFRESH_TOKEN_STALE: &str = "REFRESH_TOKEN_STALE";
/// Owner warning could not be delivered.
pub const NOTIFICATION_FAILURE: &str = "NOTIFICATION_FAILURE";
/// Credential store fault.
pub const STORE_ERROR: &str = "STORE_ERROR";
/// Signing, hashing or randomness fault.
pub const CRYPTO_FAILURE: &str = "CRYPTO_FAILURE";
/// Invalid configuration.
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
