//! Service context - dependency container for services
//!
//! Holds the repositories, the login attempt store, outbound collaborators
//! and the tunables the services read.

use std::future::Future;
use std::sync::Arc;

use ums_common::{LoginGuardConfig, RetentionConfig, TimeoutConfig, VipConfig};
use ums_core::traits::{
    AccessRecordRepository, AuditLogRepository, CardKeyRepository, LoginAttemptStore,
    MediaUserDirectory, Notifier, RepoResult, UserRepository,
};

use super::error::{ServiceError, ServiceResult};
use crate::queue::AuditRecorder;
use crate::timeout::bounded;

/// Service context containing all dependencies
///
/// Cheap to clone; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    card_key_repo: Arc<dyn CardKeyRepository>,
    user_repo: Arc<dyn UserRepository>,
    audit_log_repo: Arc<dyn AuditLogRepository>,
    access_record_repo: Arc<dyn AccessRecordRepository>,

    // Cache stores
    login_attempts: Arc<dyn LoginAttemptStore>,

    // Outbound
    notifier: Arc<dyn Notifier>,
    media_directory: Option<Arc<dyn MediaUserDirectory>>,
    audit: AuditRecorder,

    // Settings
    login_guard: LoginGuardConfig,
    vip: VipConfig,
    timeouts: TimeoutConfig,
    retention: RetentionConfig,
}

impl ServiceContext {
    /// Start building a context
    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::new()
    }

    // === Repositories ===

    /// Get the card key repository
    pub fn card_key_repo(&self) -> &dyn CardKeyRepository {
        self.card_key_repo.as_ref()
    }

    /// Get the user repository
    pub fn user_repo(&self) -> &dyn UserRepository {
        self.user_repo.as_ref()
    }

    /// Get the audit log repository
    pub fn audit_log_repo(&self) -> &dyn AuditLogRepository {
        self.audit_log_repo.as_ref()
    }

    /// Get the access record repository
    pub fn access_record_repo(&self) -> &dyn AccessRecordRepository {
        self.access_record_repo.as_ref()
    }

    // === Cache Stores ===

    /// Get the failed login attempt store
    pub fn login_attempts(&self) -> &dyn LoginAttemptStore {
        self.login_attempts.as_ref()
    }

    // === Outbound ===

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Media server directory, when one is configured
    pub fn media_directory(&self) -> Option<&dyn MediaUserDirectory> {
        self.media_directory.as_deref()
    }

    pub fn audit(&self) -> &AuditRecorder {
        &self.audit
    }

    // === Settings ===

    pub fn login_guard_config(&self) -> &LoginGuardConfig {
        &self.login_guard
    }

    pub fn vip_config(&self) -> &VipConfig {
        &self.vip
    }

    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    pub fn retention(&self) -> &RetentionConfig {
        &self.retention
    }

    // === Deadlines ===

    /// Run a store call (PostgreSQL or Redis) under the store timeout
    pub async fn store<T, F>(&self, operation: &'static str, fut: F) -> RepoResult<T>
    where
        F: Future<Output = RepoResult<T>>,
    {
        bounded(operation, self.timeouts.store, fut).await
    }

    /// Run a notification or media server call under the notify timeout
    pub async fn external<T, F>(&self, operation: &'static str, fut: F) -> RepoResult<T>
    where
        F: Future<Output = RepoResult<T>>,
    {
        bounded(operation, self.timeouts.notify, fut).await
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .field("media_directory", &self.media_directory.is_some())
            .field("login_guard", &self.login_guard)
            .field("vip", &self.vip)
            .field("timeouts", &self.timeouts)
            .field("retention", &self.retention)
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
#[derive(Default)]
pub struct ServiceContextBuilder {
    card_key_repo: Option<Arc<dyn CardKeyRepository>>,
    user_repo: Option<Arc<dyn UserRepository>>,
    audit_log_repo: Option<Arc<dyn AuditLogRepository>>,
    access_record_repo: Option<Arc<dyn AccessRecordRepository>>,
    login_attempts: Option<Arc<dyn LoginAttemptStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    media_directory: Option<Arc<dyn MediaUserDirectory>>,
    audit: Option<AuditRecorder>,
    login_guard: LoginGuardConfig,
    vip: VipConfig,
    timeouts: TimeoutConfig,
    retention: RetentionConfig,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn card_key_repo(mut self, repo: Arc<dyn CardKeyRepository>) -> Self {
        self.card_key_repo = Some(repo);
        self
    }

    pub fn user_repo(mut self, repo: Arc<dyn UserRepository>) -> Self {
        self.user_repo = Some(repo);
        self
    }

    pub fn audit_log_repo(mut self, repo: Arc<dyn AuditLogRepository>) -> Self {
        self.audit_log_repo = Some(repo);
        self
    }

    pub fn access_record_repo(mut self, repo: Arc<dyn AccessRecordRepository>) -> Self {
        self.access_record_repo = Some(repo);
        self
    }

    pub fn login_attempts(mut self, store: Arc<dyn LoginAttemptStore>) -> Self {
        self.login_attempts = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn media_directory(mut self, directory: Arc<dyn MediaUserDirectory>) -> Self {
        self.media_directory = Some(directory);
        self
    }

    pub fn audit(mut self, recorder: AuditRecorder) -> Self {
        self.audit = Some(recorder);
        self
    }

    pub fn login_guard(mut self, config: LoginGuardConfig) -> Self {
        self.login_guard = config;
        self
    }

    pub fn vip(mut self, config: VipConfig) -> Self {
        self.vip = config;
        self
    }

    pub fn timeouts(mut self, config: TimeoutConfig) -> Self {
        self.timeouts = config;
        self
    }

    pub fn retention(mut self, config: RetentionConfig) -> Self {
        self.retention = config;
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext {
            card_key_repo: required(self.card_key_repo, "card_key_repo")?,
            user_repo: required(self.user_repo, "user_repo")?,
            audit_log_repo: required(self.audit_log_repo, "audit_log_repo")?,
            access_record_repo: required(self.access_record_repo, "access_record_repo")?,
            login_attempts: required(self.login_attempts, "login_attempts")?,
            notifier: required(self.notifier, "notifier")?,
            media_directory: self.media_directory,
            audit: required(self.audit, "audit")?,
            login_guard: self.login_guard,
            vip: self.vip,
            timeouts: self.timeouts,
            retention: self.retention,
        })
    }
}

fn required<T>(value: Option<T>, name: &str) -> ServiceResult<T> {
    value.ok_or_else(|| ServiceError::validation(format!("{name} is required")))
}
