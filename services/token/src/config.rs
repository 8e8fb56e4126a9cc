//! Centralized configuration for the token rotation service.
//!
//! All configuration is loaded from environment variables and validated
//! at startup. Parsing goes through a lookup function so tests never touch
//! the process environment.

use crate::error::TokenError;
use std::env;
use std::fmt;
use std::time::Duration;
use zeroize::Zeroizing;

/// Longest raw refresh token bcrypt accepts without truncation.
const MAX_REFRESH_TOKEN_BYTES: usize = 72;

/// bcrypt cost used when `REFRESH_HASH_COST` is unset.
pub const DEFAULT_REFRESH_HASH_COST: u32 = 10;

/// HMAC key for access tokens. Zeroed on drop, never printed.
#[derive(Clone)]
pub struct SigningKey(Zeroizing<Vec<u8>>);

impl SigningKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    /// Raw key bytes for the HMAC signer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Credential store backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local maps
    Memory,
    /// Redis at the given URL
    Redis {
        /// Connection URL
        url: String,
    },
}

/// Owner warning channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierBackend {
    /// Warnings go to the service log
    Log,
    /// Warnings are POSTed to a webhook
    Webhook {
        /// Receiver endpoint
        url: String,
        /// Per-request timeout
        timeout: Duration,
    },
}

/// What a refresh does when the owner warning cannot be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationPolicy {
    /// Fail the refresh with `NotificationFailure`
    #[default]
    Abort,
    /// Log the failure and complete the rotation
    Proceed,
}

impl NotificationPolicy {
    fn parse(s: &str) -> Result<Self, TokenError> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "proceed" => Ok(Self::Proceed),
            _ => Err(TokenError::config(format!(
                "Invalid NOTIFICATION_FAILURE_POLICY: {s}"
            ))),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Human-readable multi-line output
    Pretty,
}

/// A user created at startup, from `SEED_USERS=id:guid,id:guid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedUser {
    /// Internal user id
    pub id: i64,
    /// Canonical GUID
    pub guid: String,
}

fn parse_seed_users(raw: &str) -> Result<Vec<SeedUser>, TokenError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> Result<SeedUser, TokenError> {
            let (id, guid) = entry
                .split_once(':')
                .ok_or_else(|| TokenError::config(format!("Invalid SEED_USERS entry: {entry}")))?;
            let id = id
                .trim()
                .parse()
                .map_err(|e| TokenError::config(format!("Invalid SEED_USERS id {id}: {e}")))?;
            let guid = uuid::Uuid::try_parse(guid.trim())
                .map_err(|e| TokenError::config(format!("Invalid SEED_USERS guid {guid}: {e}")))?;
            Ok(SeedUser {
                id,
                guid: guid.hyphenated().to_string(),
            })
        })
        .collect()
}

/// Token rotation service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Server settings
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    // Token settings
    /// HMAC key for access tokens
    pub signing_key: SigningKey,
    /// Access token TTL
    pub access_token_ttl: Duration,
    /// Refresh token TTL
    pub refresh_token_ttl: Duration,
    /// Length of the refresh token secret part
    pub refresh_secret_length: usize,
    /// Length of the binding key
    pub binding_key_length: usize,
    /// bcrypt cost for refresh token hashes
    pub refresh_hash_cost: u32,
    /// Tolerated access token expiry skew
    pub access_token_leeway: Duration,

    // Collaborators
    /// Credential store backend
    pub store: StoreBackend,
    /// Owner warning channel
    pub notifier: NotifierBackend,
    /// What a failed warning does to the refresh
    pub notification_policy: NotificationPolicy,
    /// Users provisioned into the store at startup
    pub seed_users: Vec<SeedUser>,

    // Transport
    /// Take the origin from `X-Forwarded-For` when present
    pub trust_forwarded_for: bool,
    /// Add `Secure` to the refresh cookie
    pub secure_cookies: bool,
    /// Drain limit after a shutdown signal
    pub shutdown_timeout: Duration,

    // Logging
    /// Default `EnvFilter` directive
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables, reading `.env` first.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, TokenError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TokenError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let host = vars.get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = vars.parse_or("PORT", 8080)?;

        let signing_key = vars.require("ACCESS_TOKEN_SIGNING_KEY")?;
        if signing_key.is_empty() {
            return Err(TokenError::config("ACCESS_TOKEN_SIGNING_KEY must not be empty"));
        }
        let signing_key = SigningKey::new(signing_key.into_bytes());

        let access_token_ttl = Duration::from_secs(vars.require_positive("ACCESS_TOKEN_TTL_SECS")?);
        let refresh_token_ttl =
            Duration::from_secs(vars.require_positive("REFRESH_TOKEN_TTL_SECS")?);
        let refresh_secret_length: usize = vars.require_positive("REFRESH_SECRET_LENGTH")?;
        let binding_key_length: usize = vars.require_positive("BINDING_KEY_LENGTH")?;

        let total = refresh_secret_length
            .saturating_add(binding_key_length)
            .saturating_add(1);
        if total > MAX_REFRESH_TOKEN_BYTES {
            return Err(TokenError::config(format!(
                "REFRESH_SECRET_LENGTH + BINDING_KEY_LENGTH + 1 must not exceed {MAX_REFRESH_TOKEN_BYTES}, got {total}"
            )));
        }

        let refresh_hash_cost = vars.parse_or("REFRESH_HASH_COST", DEFAULT_REFRESH_HASH_COST)?;
        if !(4..=31).contains(&refresh_hash_cost) {
            return Err(TokenError::config(format!(
                "REFRESH_HASH_COST must be between 4 and 31, got {refresh_hash_cost}"
            )));
        }
        let access_token_leeway = Duration::from_secs(vars.parse_or("ACCESS_TOKEN_LEEWAY_SECS", 5)?);

        let store = match vars.get_lower("STORE_BACKEND").as_deref() {
            None | Some("memory") => StoreBackend::Memory,
            Some("redis") => StoreBackend::Redis {
                url: vars.require("REDIS_URL")?,
            },
            Some(other) => {
                return Err(TokenError::config(format!("Invalid STORE_BACKEND: {other}")))
            }
        };

        let notifier = match vars.get_lower("NOTIFIER_BACKEND").as_deref() {
            None | Some("log") => NotifierBackend::Log,
            Some("webhook") => NotifierBackend::Webhook {
                url: vars.require("NOTIFIER_WEBHOOK_URL")?,
                timeout: Duration::from_secs(vars.parse_or("NOTIFIER_TIMEOUT_SECS", 5)?),
            },
            Some(other) => {
                return Err(TokenError::config(format!(
                    "Invalid NOTIFIER_BACKEND: {other}"
                )))
            }
        };

        let notification_policy = match vars.get("NOTIFICATION_FAILURE_POLICY") {
            Some(raw) => NotificationPolicy::parse(&raw)?,
            None => NotificationPolicy::default(),
        };

        let seed_users = match vars.get("SEED_USERS") {
            Some(raw) => parse_seed_users(&raw)?,
            None => Vec::new(),
        };

        let trust_forwarded_for = vars.parse_or("TRUST_FORWARDED_FOR", false)?;
        let secure_cookies = vars.parse_or("SECURE_COOKIES", false)?;
        let shutdown_timeout = Duration::from_secs(vars.parse_or("SHUTDOWN_TIMEOUT_SECS", 10)?);

        let log_level = vars.get("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let log_format = match vars.get_lower("LOG_FORMAT").as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some(other) => return Err(TokenError::config(format!("Invalid LOG_FORMAT: {other}"))),
        };

        Ok(Self {
            host,
            port,
            signing_key,
            access_token_ttl,
            refresh_token_ttl,
            refresh_secret_length,
            binding_key_length,
            refresh_hash_cost,
            access_token_leeway,
            store,
            notifier,
            notification_policy,
            seed_users,
            trust_forwarded_for,
            secure_cookies,
            shutdown_timeout,
            log_level,
            log_format,
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn get_lower(&self, name: &str) -> Option<String> {
        self.get(name).map(|v| v.trim().to_lowercase())
    }

    fn require(&self, name: &str) -> Result<String, TokenError> {
        self.get(name)
            .ok_or_else(|| TokenError::config(format!("{name} is required")))
    }

    /// Parse with default value.
    fn parse_or<T>(&self, name: &str, default: T) -> Result<T, TokenError>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        match self.get(name) {
            Some(val) => val
                .trim()
                .parse()
                .map_err(|e| TokenError::config(format!("Invalid {name}: {e}"))),
            None => Ok(default),
        }
    }

    fn require_positive<T>(&self, name: &str) -> Result<T, TokenError>
    where
        T: std::str::FromStr + PartialOrd + Default,
        T::Err: fmt::Display,
    {
        let value: T = self
            .require(name)?
            .trim()
            .parse()
            .map_err(|e| TokenError::config(format!("Invalid {name}: {e}")))?;
        if value <= T::default() {
            return Err(TokenError::config(format!("{name} must be greater than zero")));
        }
        Ok(value)
    }
}
