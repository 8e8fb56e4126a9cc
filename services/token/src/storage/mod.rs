//! Credential store contract and adapters.
//!
//! The store holds one refresh slot per user. It is the only
//! synchronization point of the service: the engine keeps no state between
//! calls and relies on `swap_refresh_slot` being atomic.

/// In-process store
pub mod memory;
/// Redis store
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::MemoryCredentialStore;
pub use self::redis::RedisCredentialStore;

/// Persisted user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// User id
    pub id: i64,
    /// Canonical GUID
    pub guid: String,
    /// Hash of the live refresh token, if any
    pub hashed_refresh_token: Option<Vec<u8>>,
    /// Expiry of the live refresh token, if any
    pub refresh_expiry: Option<DateTime<Utc>>,
}

/// New contents for a user's refresh slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSlot {
    /// bcrypt hash of the new refresh token
    pub hashed_refresh_token: Vec<u8>,
    /// Expiry of the new refresh token
    pub expiry: DateTime<Utc>,
}

/// Credential store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend unreachable or returned an error.
    #[error("backend error: {0}")]
    Backend(String),

    /// Stored data could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Write addressed a user that does not exist.
    #[error("no user with id {0}")]
    MissingUser(i64),
}

impl StoreError {
    /// Backend failure.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Undecodable record.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

/// Form a GUID is stored under: lowercase hyphenated when it parses as a
/// UUID, lowercased otherwise.
pub(crate) fn stored_guid(guid: &str) -> String {
    uuid::Uuid::try_parse(guid.trim())
        .map_or_else(|_| guid.to_lowercase(), |id| id.hyphenated().to_string())
}

/// Persistence consumed by the rotation engine.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Map a GUID to its user id.
    async fn resolve_guid(&self, guid: &str) -> Result<Option<i64>, StoreError>;

    /// Read the user row including the current refresh slot.
    async fn read_refresh_slot(&self, user_id: i64) -> Result<Option<UserRecord>, StoreError>;

    /// Overwrite the refresh slot unconditionally.
    async fn write_refresh_slot(&self, user_id: i64, slot: RefreshSlot) -> Result<(), StoreError>;

    /// Overwrite the refresh slot only if it still holds `expected_hash`.
    ///
    /// Returns `false` when another writer replaced the slot first.
    async fn swap_refresh_slot(
        &self,
        user_id: i64,
        expected_hash: &[u8],
        slot: RefreshSlot,
    ) -> Result<bool, StoreError>;

    /// Create a user with an empty refresh slot.
    ///
    /// Used for out-of-band seeding; the engine never calls it.
    async fn provision_user(&self, user_id: i64, guid: &str) -> Result<(), StoreError>;
}
