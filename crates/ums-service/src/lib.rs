//! # ums-service
//!
//! Application layer: the card key engine, VIP expiry processing, the login
//! guard, and the background machinery (worker queues and the scheduler)
//! that drives them.

pub mod dto;
pub mod queue;
pub mod scheduler;
pub mod services;
mod timeout;

pub use dto::{
    Actor, BatchDeleteCardKeysRequest, CardKeyStatistics, CleanupReport,
    CreateCardKeysRequest, ExpiredBatchSummary, ListCardKeysRequest, Page, UserSyncReport,
    VipExpiryReport, VipStatistics,
};
pub use queue::{
    AuditRecorder, AuditWriter, JobHandler, NotifyHandler, QueueError, QueuedNotifier,
    WorkerQueue,
};
pub use scheduler::{CleanupTask, PeriodicTask, Scheduler, UserSyncTask, VipExpiryTask};
pub use services::{
    AuthService, CardKeyService, CleanupService, FailureOutcome, LoginGuard, LoginState,
    ServiceContext, ServiceContextBuilder, ServiceError, ServiceResult, UserSyncService,
    VipExpiryService,
};
