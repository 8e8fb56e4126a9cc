//! Rotation engine.
//!
//! Stateless between calls: every piece of durable state lives in the
//! credential store, and the only write of a refresh is a compare-and-swap
//! against the hash that was just verified.

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, NotificationPolicy};
use crate::error::TokenError;
use crate::jwt::AccessTokenCodec;
use crate::metrics;
use crate::notify::Notifier;
use crate::refresh::{compare_refresh_hash, fingerprint, split_refresh_token, RefreshTokenGenerator};
use crate::rotation::warning::warning_message;
use crate::storage::{CredentialStore, RefreshSlot};
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Lifetimes and policies applied by the engine.
#[derive(Debug, Clone, Copy)]
pub struct RotationSettings {
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
    /// Tolerated skew past the access token's `exp`.
    pub access_token_leeway: Duration,
    /// Outcome of a refresh whose owner warning failed
    pub notification_policy: NotificationPolicy,
}

impl RotationSettings {
    /// Settings from validated configuration.
    pub fn from_config(config: &Config) -> Result<Self, TokenError> {
        let convert = |name: &str, d: std::time::Duration| {
            Duration::from_std(d).map_err(|e| TokenError::config(format!("{name} out of range: {e}")))
        };

        Ok(RotationSettings {
            access_token_ttl: convert("ACCESS_TOKEN_TTL_SECS", config.access_token_ttl)?,
            refresh_token_ttl: convert("REFRESH_TOKEN_TTL_SECS", config.refresh_token_ttl)?,
            access_token_leeway: convert("ACCESS_TOKEN_LEEWAY_SECS", config.access_token_leeway)?,
            notification_policy: config.notification_policy,
        })
    }
}

/// Token pair handed back to the transport.
#[derive(Clone)]
pub struct IssuedTokens {
    /// Signed access token
    pub access_token: String,
    /// Raw refresh token
    pub refresh_token: String,
    /// When the refresh token stops working
    pub refresh_expiry: DateTime<Utc>,
}

impl fmt::Debug for IssuedTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedTokens")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("refresh_expiry", &self.refresh_expiry)
            .finish()
    }
}

/// Issues token pairs and rotates them on refresh.
pub struct RotationEngine {
    codec: AccessTokenCodec,
    generator: RefreshTokenGenerator,
    settings: RotationSettings,
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl RotationEngine {
    /// Engine on the system clock.
    pub fn new(
        codec: AccessTokenCodec,
        generator: RefreshTokenGenerator,
        settings: RotationSettings,
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        RotationEngine {
            codec,
            generator,
            settings,
            store,
            notifier,
            clock: Arc::new(SystemClock),
        }
    }

    /// Build an engine from validated configuration.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, TokenError> {
        Ok(Self::new(
            AccessTokenCodec::new(config.signing_key.as_bytes()),
            RefreshTokenGenerator::new(
                config.refresh_secret_length,
                config.binding_key_length,
                config.refresh_hash_cost,
            ),
            RotationSettings::from_config(config)?,
            store,
            notifier,
        ))
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Issue a fresh token pair for `guid`, replacing any prior refresh slot.
    #[instrument(skip(self), fields(user_id = tracing::field::Empty))]
    pub async fn issue(&self, guid: &str, origin_addr: &str) -> Result<IssuedTokens, TokenError> {
        let result = self.issue_pair(guid, origin_addr).await;
        metrics::record_token_issued(outcome(&result));
        result
    }

    /// Rotate a presented token pair.
    #[instrument(skip(self, refresh_token, access_token), fields(user_id = tracing::field::Empty))]
    pub async fn refresh(
        &self,
        refresh_token: &str,
        access_token: &str,
        origin_addr: &str,
        user_agent: &str,
    ) -> Result<IssuedTokens, TokenError> {
        let result = self
            .rotate_pair(refresh_token, access_token, origin_addr, user_agent)
            .await;
        if let Err(e) = &result {
            if e.is_server_fault() {
                error!(code = e.code(), error = %e, "Refresh failed");
            } else {
                warn!(code = e.code(), error = %e, "Refresh rejected");
            }
        }
        metrics::record_token_refreshed(outcome(&result));
        result
    }

    async fn issue_pair(&self, guid: &str, origin_addr: &str) -> Result<IssuedTokens, TokenError> {
        let guid = canonical_guid(guid)?;
        let user_id = self
            .store
            .resolve_guid(&guid)
            .await?
            .ok_or(TokenError::UnknownSubject)?;
        tracing::Span::current().record("user_id", user_id);

        let now = self.clock.now();
        let refresh_expiry = now + self.settings.refresh_token_ttl;
        let refresh = self.mint_refresh(user_id, refresh_expiry).await?;
        let access_token = self.codec.sign(
            user_id,
            origin_addr,
            &refresh.binding_key,
            now,
            self.settings.access_token_ttl,
        )?;

        self.store
            .write_refresh_slot(
                user_id,
                RefreshSlot {
                    hashed_refresh_token: refresh.hashed_value.clone(),
                    expiry: refresh_expiry,
                },
            )
            .await?;

        info!(
            user_id,
            refresh_fingerprint = %fingerprint(&refresh.raw_value),
            "Issued token pair"
        );

        Ok(IssuedTokens {
            access_token,
            refresh_token: refresh.raw_value.clone(),
            refresh_expiry,
        })
    }

    async fn rotate_pair(
        &self,
        refresh_token: &str,
        access_token: &str,
        origin_addr: &str,
        user_agent: &str,
    ) -> Result<IssuedTokens, TokenError> {
        let presented = split_refresh_token(refresh_token)?;
        let access = self.codec.parse_and_verify(access_token)?;
        tracing::Span::current().record("user_id", access.user_id);

        let keys_match: bool = access
            .binding_key
            .as_bytes()
            .ct_eq(presented.binding_key.as_bytes())
            .into();
        if !keys_match {
            return Err(TokenError::BindingMismatch);
        }

        let now = self.clock.now();
        if access.is_expired_at(now, self.settings.access_token_leeway) {
            return Err(TokenError::AccessTokenExpired);
        }

        let record = self
            .store
            .read_refresh_slot(access.user_id)
            .await?
            .ok_or(TokenError::UnknownSubject)?;

        match record.refresh_expiry {
            Some(expiry) if now < expiry => {}
            _ => return Err(TokenError::RefreshExpired),
        }

        let stored_hash = record
            .hashed_refresh_token
            .ok_or(TokenError::RefreshTokenStale)?;
        if !self.verify_refresh(&stored_hash, &presented.raw_value).await? {
            return Err(TokenError::RefreshTokenStale);
        }

        if origin_addr != access.origin_addr {
            warn!(
                user_id = access.user_id,
                expected = %access.origin_addr,
                actual = %origin_addr,
                "Refresh from unrecognized origin"
            );
            self.warn_owner(&record.guid, origin_addr, user_agent).await?;
        }

        let refresh_expiry = now + self.settings.refresh_token_ttl;
        let refresh = self.mint_refresh(access.user_id, refresh_expiry).await?;
        let new_access_token = self.codec.sign(
            access.user_id,
            origin_addr,
            &refresh.binding_key,
            now,
            self.settings.access_token_ttl,
        )?;

        let swapped = self
            .store
            .swap_refresh_slot(
                access.user_id,
                &stored_hash,
                RefreshSlot {
                    hashed_refresh_token: refresh.hashed_value.clone(),
                    expiry: refresh_expiry,
                },
            )
            .await?;
        if !swapped {
            // A concurrent refresh consumed the same token first.
            return Err(TokenError::RefreshTokenStale);
        }

        info!(
            user_id = access.user_id,
            consumed_fingerprint = %fingerprint(&presented.raw_value),
            refresh_fingerprint = %fingerprint(&refresh.raw_value),
            "Rotated token pair"
        );

        Ok(IssuedTokens {
            access_token: new_access_token,
            refresh_token: refresh.raw_value.clone(),
            refresh_expiry,
        })
    }

    async fn warn_owner(
        &self,
        guid: &str,
        origin_addr: &str,
        user_agent: &str,
    ) -> Result<(), TokenError> {
        let message = warning_message(origin_addr, user_agent);
        match self.notifier.send(guid, &message).await {
            Ok(()) => {
                metrics::record_origin_warning(self.notifier.name(), "sent");
                info!(recipient = %guid, "Owner warning sent");
                Ok(())
            }
            Err(e) => {
                metrics::record_origin_warning(self.notifier.name(), "failed");
                match self.settings.notification_policy {
                    NotificationPolicy::Abort => Err(TokenError::NotificationFailure(e)),
                    NotificationPolicy::Proceed => {
                        error!(recipient = %guid, error = %e, "Owner warning failed, rotating anyway");
                        Ok(())
                    }
                }
            }
        }
    }

    async fn mint_refresh(
        &self,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<crate::refresh::RefreshToken, TokenError> {
        let generator = self.generator;
        tokio::task::spawn_blocking(move || generator.mint(user_id, expires_at))
            .await
            .map_err(|e| TokenError::crypto(format!("hashing task failed: {e}")))?
    }

    async fn verify_refresh(&self, stored_hash: &[u8], raw_value: &str) -> Result<bool, TokenError> {
        let hash = stored_hash.to_vec();
        let raw_value = zeroize::Zeroizing::new(raw_value.to_string());
        tokio::task::spawn_blocking(move || compare_refresh_hash(&hash, &raw_value))
            .await
            .map_err(|e| TokenError::crypto(format!("hash comparison task failed: {e}")))?
    }
}

/// Parse a GUID and return its lowercase hyphenated form.
pub fn canonical_guid(guid: &str) -> Result<String, TokenError> {
    Uuid::try_parse(guid.trim())
        .map(|id| id.hyphenated().to_string())
        .map_err(|_| TokenError::invalid_input("guid is not a valid UUID"))
}

fn outcome<T>(result: &Result<T, TokenError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) => e.code(),
    }
}
