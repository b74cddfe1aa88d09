use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use ums_common::QueueConfig;
use ums_core::entities::ExpiryWarning;
use ums_core::traits::{Notifier, RepoResult};

use super::{JobHandler, WorkerQueue};
use crate::timeout::bounded;

/// Delivers queued warnings through the real notifier, one at a time
pub struct NotifyHandler {
    inner: Arc<dyn Notifier>,
    timeout: Duration,
}

impl NotifyHandler {
    pub fn new(inner: Arc<dyn Notifier>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl JobHandler<ExpiryWarning> for NotifyHandler {
    async fn handle(&self, warning: ExpiryWarning) -> RepoResult<()> {
        bounded(
            "notification dispatch",
            self.timeout,
            self.inner.send_expiry_warning(&warning),
        )
        .await?;
        debug!(to = %warning.address, "Expiry warning delivered");
        Ok(())
    }
}

/// `Notifier` that hands warnings to a bounded queue instead of sending inline
///
/// A successful call means the warning was accepted for delivery.
#[derive(Clone, Debug)]
pub struct QueuedNotifier {
    queue: WorkerQueue<ExpiryWarning>,
}

impl QueuedNotifier {
    pub fn spawn(
        inner: Arc<dyn Notifier>,
        notify_timeout: Duration,
        config: QueueConfig,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let handler = Arc::new(NotifyHandler::new(inner, notify_timeout));
        let (queue, handle) = WorkerQueue::spawn("notify", handler, config, cancel);
        (Self { queue }, handle)
    }
}

#[async_trait]
impl Notifier for QueuedNotifier {
    async fn send_expiry_warning(&self, warning: &ExpiryWarning) -> RepoResult<()> {
        self.queue.submit(warning.clone()).await?;
        Ok(())
    }
}
