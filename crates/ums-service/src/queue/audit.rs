use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use ums_common::QueueConfig;
use ums_core::entities::AuditEntry;
use ums_core::traits::{AuditLogRepository, RepoResult};

use super::{JobHandler, WorkerQueue};
use crate::timeout::bounded;

/// Writes queued audit entries to the store
pub struct AuditWriter {
    repo: Arc<dyn AuditLogRepository>,
    timeout: Duration,
}

impl AuditWriter {
    pub fn new(repo: Arc<dyn AuditLogRepository>, timeout: Duration) -> Self {
        Self { repo, timeout }
    }
}

#[async_trait]
impl JobHandler<AuditEntry> for AuditWriter {
    async fn handle(&self, entry: AuditEntry) -> RepoResult<()> {
        bounded("audit log write", self.timeout, self.repo.create(&entry)).await
    }
}

/// Fire-and-forget audit trail
///
/// Recording never fails the caller; entries that cannot be queued are
/// logged and dropped.
#[derive(Clone, Debug)]
pub struct AuditRecorder {
    queue: WorkerQueue<AuditEntry>,
}

impl AuditRecorder {
    pub fn spawn(
        repo: Arc<dyn AuditLogRepository>,
        store_timeout: Duration,
        config: QueueConfig,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let handler = Arc::new(AuditWriter::new(repo, store_timeout));
        let (queue, handle) = WorkerQueue::spawn("audit", handler, config, cancel);
        (Self { queue }, handle)
    }

    pub async fn record(&self, entry: AuditEntry) {
        let action = entry.action;
        if let Err(e) = self.queue.submit(entry).await {
            warn!(action = %action, error = %e, "Audit entry dropped");
        }
    }
}
