//! Redis-backed credential store.
//!
//! Layout:
//! - `auth:guid:{guid}` -> user id
//! - `auth:user:{id}` hash with `guid`, `hashed_refresh_token`, `refresh_expiry`
//!
//! Slot writes run as Lua scripts so the existence check and the
//! compare-and-overwrite happen in one server-side step.

use crate::storage::{stored_guid, CredentialStore, RefreshSlot, StoreError, UserRecord};
use async_trait::async_trait;
use chrono::DateTime;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;
use tracing::info;

const WRITE_SLOT_LUA: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('HSET', KEYS[1], 'hashed_refresh_token', ARGV[1], 'refresh_expiry', ARGV[2])
return 1
";

const SWAP_SLOT_LUA: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return -1
end
local current = redis.call('HGET', KEYS[1], 'hashed_refresh_token')
if current ~= ARGV[1] then
    return 0
end
redis.call('HSET', KEYS[1], 'hashed_refresh_token', ARGV[2], 'refresh_expiry', ARGV[3])
return 1
";

const FIELD_GUID: &str = "guid";
const FIELD_HASH: &str = "hashed_refresh_token";
const FIELD_EXPIRY: &str = "refresh_expiry";

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

fn user_key(user_id: i64) -> String {
    format!("auth:user:{user_id}")
}

fn guid_key(guid: &str) -> String {
    format!("auth:guid:{guid}")
}

/// Redis-backed store. Slot writes run as Lua scripts.
pub struct RedisCredentialStore {
    conn: ConnectionManager,
    write_slot: Script,
    swap_slot: Script,
}

impl RedisCredentialStore {
    /// Connect to `redis_url`.
    pub async fn new(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        info!("Connected credential store to Redis");

        Ok(RedisCredentialStore {
            conn,
            write_slot: Script::new(WRITE_SLOT_LUA),
            swap_slot: Script::new(SWAP_SLOT_LUA),
        })
    }
}

fn decode_record(user_id: i64, mut fields: HashMap<String, Vec<u8>>) -> Result<UserRecord, StoreError> {
    let guid = fields
        .remove(FIELD_GUID)
        .ok_or_else(|| StoreError::corrupt(format!("user {user_id} has no guid")))?;
    let guid = String::from_utf8(guid)
        .map_err(|_| StoreError::corrupt(format!("user {user_id} guid is not UTF-8")))?;

    let refresh_expiry = match fields.remove(FIELD_EXPIRY) {
        Some(raw) => {
            let secs: i64 = std::str::from_utf8(&raw)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| StoreError::corrupt(format!("user {user_id} expiry unreadable")))?;
            Some(
                DateTime::from_timestamp(secs, 0)
                    .ok_or_else(|| StoreError::corrupt(format!("user {user_id} expiry out of range")))?,
            )
        }
        None => None,
    };

    Ok(UserRecord {
        id: user_id,
        guid,
        hashed_refresh_token: fields.remove(FIELD_HASH),
        refresh_expiry,
    })
}

#[async_trait]
impl CredentialStore for RedisCredentialStore {
    async fn resolve_guid(&self, guid: &str) -> Result<Option<i64>, StoreError> {
        let mut conn = self.conn.clone();
        let id: Option<i64> = conn.get(guid_key(guid)).await?;
        Ok(id)
    }

    async fn read_refresh_slot(&self, user_id: i64) -> Result<Option<UserRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, Vec<u8>> = conn.hgetall(user_key(user_id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        decode_record(user_id, fields).map(Some)
    }

    async fn write_refresh_slot(&self, user_id: i64, slot: RefreshSlot) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let written: i64 = self
            .write_slot
            .key(user_key(user_id))
            .arg(slot.hashed_refresh_token)
            .arg(slot.expiry.timestamp())
            .invoke_async(&mut conn)
            .await?;

        if written == 0 {
            return Err(StoreError::MissingUser(user_id));
        }
        Ok(())
    }

    async fn swap_refresh_slot(
        &self,
        user_id: i64,
        expected_hash: &[u8],
        slot: RefreshSlot,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let outcome: i64 = self
            .swap_slot
            .key(user_key(user_id))
            .arg(expected_hash)
            .arg(slot.hashed_refresh_token)
            .arg(slot.expiry.timestamp())
            .invoke_async(&mut conn)
            .await?;

        match outcome {
            1 => Ok(true),
            0 => Ok(false),
            _ => Err(StoreError::MissingUser(user_id)),
        }
    }

    async fn provision_user(&self, user_id: i64, guid: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let guid = stored_guid(guid);
        let (): () = redis::pipe()
            .atomic()
            .set(guid_key(&guid), user_id)
            .ignore()
            .hset(user_key(user_id), FIELD_GUID, &guid)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fields(pairs: &[(&str, &[u8])]) -> HashMap<String, Vec<u8>> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.to_vec()))
            .collect()
    }

    #[test]
    fn test_decode_full_record() {
        let now = Utc::now().timestamp();
        let expiry = now.to_string();
        let record = decode_record(
            4,
            fields(&[
                (FIELD_GUID, b"g-1"),
                (FIELD_HASH, b"$2b$04$hash"),
                (FIELD_EXPIRY, expiry.as_bytes()),
            ]),
        )
        .unwrap();

        assert_eq!(record.id, 4);
        assert_eq!(record.guid, "g-1");
        assert_eq!(record.hashed_refresh_token.as_deref(), Some(&b"$2b$04$hash"[..]));
        assert_eq!(record.refresh_expiry.unwrap().timestamp(), now);
    }

    #[test]
    fn test_decode_empty_slot() {
        let record = decode_record(1, fields(&[(FIELD_GUID, b"g")])).unwrap();
        assert!(record.hashed_refresh_token.is_none());
        assert!(record.refresh_expiry.is_none());
    }

    #[test]
    fn test_decode_corrupt() {
        assert!(matches!(
            decode_record(1, fields(&[(FIELD_HASH, b"h")])),
            Err(StoreError::Corrupt(_))
        ));
        assert!(matches!(
            decode_record(1, fields(&[(FIELD_GUID, b"g"), (FIELD_EXPIRY, b"soon")])),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_keys() {
        assert_eq!(user_key(12), "auth:user:12");
        assert_eq!(guid_key("abc"), "auth:guid:abc");
    }
}
