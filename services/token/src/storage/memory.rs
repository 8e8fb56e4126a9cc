//! In-process credential store.

use crate::storage::{stored_guid, CredentialStore, RefreshSlot, StoreError, UserRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<i64, UserRecord>,
    guid_index: HashMap<String, i64>,
}

/// Credential store backed by process memory.
///
/// A single lock guards both tables, so `swap_refresh_slot` is atomic.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tables: RwLock<Tables>,
}

impl MemoryCredentialStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a user with an empty refresh slot.
    pub async fn insert_user(&self, id: i64, guid: &str) {
        let guid = stored_guid(guid);
        let mut tables = self.tables.write().await;
        tables.guid_index.insert(guid.clone(), id);
        tables.users.insert(
            id,
            UserRecord {
                id,
                guid,
                hashed_refresh_token: None,
                refresh_expiry: None,
            },
        );
    }

    /// Number of provisioned users.
    pub async fn len(&self) -> usize {
        self.tables.read().await.users.len()
    }

    /// Whether no user is provisioned.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn resolve_guid(&self, guid: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.tables.read().await.guid_index.get(guid).copied())
    }

    async fn read_refresh_slot(&self, user_id: i64) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn write_refresh_slot(&self, user_id: i64, slot: RefreshSlot) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::MissingUser(user_id))?;
        user.hashed_refresh_token = Some(slot.hashed_refresh_token);
        user.refresh_expiry = Some(slot.expiry);
        Ok(())
    }

    async fn swap_refresh_slot(
        &self,
        user_id: i64,
        expected_hash: &[u8],
        slot: RefreshSlot,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::MissingUser(user_id))?;

        if user.hashed_refresh_token.as_deref() != Some(expected_hash) {
            return Ok(false);
        }
        user.hashed_refresh_token = Some(slot.hashed_refresh_token);
        user.refresh_expiry = Some(slot.expiry);
        Ok(true)
    }

    async fn provision_user(&self, user_id: i64, guid: &str) -> Result<(), StoreError> {
        self.insert_user(user_id, guid).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn slot(hash: &[u8]) -> RefreshSlot {
        RefreshSlot {
            hashed_refresh_token: hash.to_vec(),
            expiry: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_resolve_and_read() {
        let store = MemoryCredentialStore::new();
        store.insert_user(3, "ABC").await;

        assert_eq!(store.resolve_guid("abc").await.unwrap(), Some(3));
        assert_eq!(store.resolve_guid("zzz").await.unwrap(), None);

        let record = store.read_refresh_slot(3).await.unwrap().unwrap();
        assert_eq!(record.guid, "abc");
        assert!(record.hashed_refresh_token.is_none());
        assert!(store.read_refresh_slot(4).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let store = MemoryCredentialStore::new();
        store.insert_user(1, "g").await;

        store.write_refresh_slot(1, slot(b"h1")).await.unwrap();
        store.write_refresh_slot(1, slot(b"h2")).await.unwrap();

        let record = store.read_refresh_slot(1).await.unwrap().unwrap();
        assert_eq!(record.hashed_refresh_token.as_deref(), Some(&b"h2"[..]));
    }

    #[tokio::test]
    async fn test_write_unknown_user() {
        let store = MemoryCredentialStore::new();
        let result = store.write_refresh_slot(9, slot(b"h")).await;
        assert!(matches!(result, Err(StoreError::MissingUser(9))));
    }

    #[tokio::test]
    async fn test_swap_requires_expected_hash() {
        let store = MemoryCredentialStore::new();
        store.insert_user(1, "g").await;
        store.write_refresh_slot(1, slot(b"h1")).await.unwrap();

        assert!(store.swap_refresh_slot(1, b"h1", slot(b"h2")).await.unwrap());
        assert!(!store.swap_refresh_slot(1, b"h1", slot(b"h3")).await.unwrap());

        let record = store.read_refresh_slot(1).await.unwrap().unwrap();
        assert_eq!(record.hashed_refresh_token.as_deref(), Some(&b"h2"[..]));
    }

    #[tokio::test]
    async fn test_provision_through_trait() {
        let store = MemoryCredentialStore::new();
        let dyn_store: &dyn CredentialStore = &store;
        dyn_store.provision_user(8, "G8").await.unwrap();

        assert_eq!(store.resolve_guid("g8").await.unwrap(), Some(8));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_insert_user_canonicalizes_uuid() {
        let store = MemoryCredentialStore::new();
        store.insert_user(5, "3F2504E04F8911D39A0C0305E82C3301").await;

        assert_eq!(
            store.resolve_guid("3f2504e0-4f89-11d3-9a0c-0305e82c3301").await.unwrap(),
            Some(5)
        );
        let record = store.read_refresh_slot(5).await.unwrap().unwrap();
        assert_eq!(record.guid, "3f2504e0-4f89-11d3-9a0c-0305e82c3301");
    }

    #[tokio::test]
    async fn test_swap_on_empty_slot_fails() {
        let store = MemoryCredentialStore::new();
        store.insert_user(1, "g").await;
        assert!(!store.swap_refresh_slot(1, b"h", slot(b"h2")).await.unwrap());
    }
}
