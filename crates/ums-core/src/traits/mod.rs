mod collaborators;
mod repositories;

pub use collaborators::{LoginAttemptStore, MediaUserDirectory, Notifier};
pub use repositories::{
    AccessRecordRepository, AuditLogRepository, CardKeyCounts, CardKeyFilter, CardKeyRepository,
    PageRequest, Redemption, RepoResult, UserRepository, MAX_PAGE_SIZE,
};
