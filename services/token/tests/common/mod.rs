//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use token_rotation::clock::ManualClock;
use token_rotation::config::NotificationPolicy;
use token_rotation::jwt::AccessTokenCodec;
use token_rotation::notify::RecordingNotifier;
use token_rotation::refresh::RefreshTokenGenerator;
use token_rotation::storage::{
    CredentialStore, MemoryCredentialStore, RefreshSlot, StoreError, UserRecord,
};
use token_rotation::{RotationEngine, RotationSettings};

pub const SIGNING_KEY: &[u8] = b"integration-test-signing-key-0123456789";
pub const USER_ID: i64 = 42;
pub const GUID: &str = "6f9619ff-8b86-d011-b42d-00c04fc964ff";
pub const IP_A: &str = "192.0.2.1";
pub const IP_B: &str = "198.51.100.2";
pub const USER_AGENT: &str = "integration-test/1.0";

/// Lowest bcrypt cost, keeps tests fast.
pub const HASH_COST: u32 = 4;

pub fn settings() -> RotationSettings {
    RotationSettings {
        access_token_ttl: Duration::minutes(15),
        refresh_token_ttl: Duration::hours(24),
        access_token_leeway: Duration::seconds(5),
        notification_policy: NotificationPolicy::Abort,
    }
}

/// Memory store whose writes can be switched to fail with a backend error.
/// Reads always pass through.
#[derive(Debug, Default)]
pub struct FlakyCredentialStore {
    inner: Arc<MemoryCredentialStore>,
    fail_writes: AtomicBool,
}

impl FlakyCredentialStore {
    pub fn new(inner: Arc<MemoryCredentialStore>) -> Self {
        FlakyCredentialStore {
            inner,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::backend("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CredentialStore for FlakyCredentialStore {
    async fn resolve_guid(&self, guid: &str) -> Result<Option<i64>, StoreError> {
        self.inner.resolve_guid(guid).await
    }

    async fn read_refresh_slot(&self, user_id: i64) -> Result<Option<UserRecord>, StoreError> {
        self.inner.read_refresh_slot(user_id).await
    }

    async fn write_refresh_slot(&self, user_id: i64, slot: RefreshSlot) -> Result<(), StoreError> {
        self.check()?;
        self.inner.write_refresh_slot(user_id, slot).await
    }

    async fn swap_refresh_slot(
        &self,
        user_id: i64,
        expected_hash: &[u8],
        slot: RefreshSlot,
    ) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.swap_refresh_slot(user_id, expected_hash, slot).await
    }

    async fn provision_user(&self, user_id: i64, guid: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.provision_user(user_id, guid).await
    }
}

pub struct Harness {
    pub engine: RotationEngine,
    pub store: Arc<MemoryCredentialStore>,
    /// Wraps `store`; the engine writes through it.
    pub flaky: Arc<FlakyCredentialStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::build(settings(), RecordingNotifier::new()).await
    }

    pub async fn build(settings: RotationSettings, notifier: RecordingNotifier) -> Self {
        let store = Arc::new(MemoryCredentialStore::new());
        store.insert_user(USER_ID, GUID).await;

        let flaky = Arc::new(FlakyCredentialStore::new(store.clone()));

        let notifier = Arc::new(notifier);
        let clock = Arc::new(ManualClock::new(Utc::now()));

        let engine = RotationEngine::new(
            AccessTokenCodec::new(SIGNING_KEY),
            RefreshTokenGenerator::new(32, 16, HASH_COST),
            settings,
            flaky.clone(),
            notifier.clone(),
        )
        .with_clock(clock.clone());

        Harness {
            engine,
            store,
            flaky,
            notifier,
            clock,
        }
    }

    pub fn codec(&self) -> AccessTokenCodec {
        AccessTokenCodec::new(SIGNING_KEY)
    }
}
