//! Test fixtures and data generators
//!
//! `TestHarness` wires a `ServiceContext` to the in-memory fakes and keeps
//! handles to them so tests can seed data and inspect side effects.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use ums_common::{
    hash_password, LoginGuardConfig, QueueConfig, RetentionConfig, TimeoutConfig, VipConfig,
};
use ums_core::entities::{AuditEntry, CardKey, CardType, User};
use ums_core::traits::{MediaUserDirectory, UserRepository};
use ums_core::value_objects::UserId;
use ums_service::{Actor, AuditRecorder, CardKeyService, CreateCardKeysRequest, ServiceContext};

use crate::fakes::{MemoryAttemptStore, MemoryStore, RecordingNotifier};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Password every seeded user logs in with
pub const TEST_PASSWORD: &str = "TestPass123!";

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Unique username with a readable prefix
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}{}", unique_suffix())
}

/// Settings that differ between tests
#[derive(Default)]
pub struct HarnessOptions {
    pub login_guard: LoginGuardConfig,
    pub vip: VipConfig,
    pub timeouts: TimeoutConfig,
    pub retention: RetentionConfig,
    pub directory: Option<Arc<dyn MediaUserDirectory>>,
}

/// Service context over in-memory collaborators
pub struct TestHarness {
    pub ctx: ServiceContext,
    pub store: Arc<MemoryStore>,
    pub attempts: Arc<MemoryAttemptStore>,
    pub notifier: Arc<RecordingNotifier>,
    cancel: CancellationToken,
    audit_handle: Option<JoinHandle<()>>,
}

impl TestHarness {
    /// Harness with default configuration; must run inside a tokio runtime
    pub fn new() -> Self {
        Self::with_options(HarnessOptions::default())
    }

    pub fn with_options(options: HarnessOptions) -> Self {
        let store = Arc::new(MemoryStore::new());
        let attempts = Arc::new(MemoryAttemptStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let cancel = CancellationToken::new();

        let (audit, audit_handle) = AuditRecorder::spawn(
            store.clone(),
            options.timeouts.store,
            QueueConfig::default(),
            cancel.clone(),
        );

        let mut builder = ServiceContext::builder()
            .card_key_repo(store.clone())
            .user_repo(store.clone())
            .audit_log_repo(store.clone())
            .access_record_repo(store.clone())
            .login_attempts(attempts.clone())
            .notifier(notifier.clone())
            .audit(audit)
            .login_guard(options.login_guard)
            .vip(options.vip)
            .timeouts(options.timeouts)
            .retention(options.retention);
        if let Some(directory) = options.directory {
            builder = builder.media_directory(directory);
        }
        let ctx = builder.build().expect("all collaborators provided");

        Self {
            ctx,
            store,
            attempts,
            notifier,
            cancel,
            audit_handle: Some(audit_handle),
        }
    }

    /// Stop the audit worker and return everything it wrote
    ///
    /// Entries recorded after this call are dropped.
    pub async fn audit_entries(&mut self) -> Vec<AuditEntry> {
        self.cancel.cancel();
        if let Some(handle) = self.audit_handle.take() {
            handle.await.expect("audit worker panicked");
        }
        self.store.audit_entries()
    }

    pub fn admin(&self) -> Actor {
        Actor::new(UserId::new(1_000_000), "admin")
    }

    /// Standard member with an email address and `TEST_PASSWORD`
    pub async fn seed_user(&self, prefix: &str) -> User {
        let name = unique_name(prefix);
        let email = format!("{name}@example.com");
        self.insert_user(User::new(name, Some(email)), TEST_PASSWORD)
            .await
    }

    /// Store `user` with the hash of `password`
    pub async fn insert_user(&self, user: User, password: &str) -> User {
        let hash = hash_password(password).expect("hashable password");
        self.insert_user_with_hash(user, &hash).await
    }

    pub async fn insert_user_with_hash(&self, user: User, hash: &str) -> User {
        UserRepository::create(self.store.as_ref(), &user, hash)
            .await
            .expect("unique username")
    }

    /// VIP member expiring at `expire_at`
    pub async fn seed_vip(
        &self,
        prefix: &str,
        email: Option<&str>,
        expire_at: DateTime<Utc>,
    ) -> User {
        let user = User::new(unique_name(prefix), email.map(str::to_string));
        let mut user = self.insert_user_with_hash(user, "!").await;
        user.grant_vip(expire_at, Utc::now());
        self.store.put_user(user.clone());
        user
    }

    /// Generate `count` VIP keys worth `duration_days` each
    pub async fn seed_keys(&self, count: u32, duration_days: i32) -> Vec<CardKey> {
        self.seed_keys_of(CardType::VipUpgrade, count, duration_days)
            .await
    }

    pub async fn seed_keys_of(
        &self,
        card_type: CardType,
        count: u32,
        duration_days: i32,
    ) -> Vec<CardKey> {
        let request = CreateCardKeysRequest {
            card_type,
            count,
            duration_days,
            remark: None,
            expire_at: None,
        };
        CardKeyService::new(&self.ctx)
            .create(&self.admin(), request)
            .await
            .expect("valid key request")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
