use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ums_common::QueueConfig;
use ums_core::traits::RepoResult;
use ums_core::DomainError;

/// Consumer side of a [`WorkerQueue`]
#[async_trait]
pub trait JobHandler<T: Send + 'static>: Send + Sync + 'static {
    async fn handle(&self, job: T) -> RepoResult<()>;
}

/// Errors submitting a job
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("{queue} queue is full (waited {timeout_ms}ms)")]
    Full { queue: &'static str, timeout_ms: u64 },

    #[error("{0} queue is closed")]
    Closed(&'static str),
}

impl From<QueueError> for DomainError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Full { queue, timeout_ms } => DomainError::Timeout {
                operation: queue,
                timeout_ms,
            },
            QueueError::Closed(_) => DomainError::InternalError(err.to_string()),
        }
    }
}

/// Producer handle for a bounded single-consumer queue
pub struct WorkerQueue<T> {
    name: &'static str,
    sender: mpsc::Sender<T>,
    submit_timeout: Duration,
}

impl<T> Clone for WorkerQueue<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            sender: self.sender.clone(),
            submit_timeout: self.submit_timeout,
        }
    }
}

impl<T> std::fmt::Debug for WorkerQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerQueue")
            .field("name", &self.name)
            .field("free_slots", &self.sender.capacity())
            .finish()
    }
}

impl<T: Send + 'static> WorkerQueue<T> {
    /// Start the consumer task and return the producer handle
    ///
    /// The consumer stops when `cancel` fires, handling whatever was already
    /// queued before it exits.
    pub fn spawn<H>(
        name: &'static str,
        handler: Arc<H>,
        config: QueueConfig,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>)
    where
        H: JobHandler<T> + ?Sized,
    {
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        let handle = tokio::spawn(run_worker(name, receiver, handler, cancel));

        info!(
            queue = name,
            capacity = config.capacity,
            submit_timeout_ms = config.submit_timeout.as_millis() as u64,
            "Worker queue started"
        );

        (
            Self {
                name,
                sender,
                submit_timeout: config.submit_timeout,
            },
            handle,
        )
    }

    /// Enqueue a job, waiting at most the submit timeout for a free slot
    pub async fn submit(&self, job: T) -> Result<(), QueueError> {
        match self.sender.send_timeout(job, self.submit_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(QueueError::Full {
                queue: self.name,
                timeout_ms: self.submit_timeout.as_millis() as u64,
            }),
            Err(SendTimeoutError::Closed(_)) => Err(QueueError::Closed(self.name)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

async fn run_worker<T, H>(
    name: &'static str,
    mut receiver: mpsc::Receiver<T>,
    handler: Arc<H>,
    cancel: CancellationToken,
) where
    T: Send + 'static,
    H: JobHandler<T> + ?Sized,
{
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            job = receiver.recv() => match job {
                Some(job) => handle_job(name, handler.as_ref(), job).await,
                None => {
                    debug!(queue = name, "All producers dropped");
                    return;
                }
            },
        }
    }

    // Refuse new jobs, finish the ones already accepted
    receiver.close();
    let mut drained = 0u64;
    while let Some(job) = receiver.recv().await {
        handle_job(name, handler.as_ref(), job).await;
        drained += 1;
    }
    info!(queue = name, drained, "Worker queue stopped");
}

async fn handle_job<T, H>(name: &'static str, handler: &H, job: T)
where
    T: Send + 'static,
    H: JobHandler<T> + ?Sized,
{
    if let Err(e) = handler.handle(job).await {
        warn!(queue = name, error = %e, "Queued job failed");
    }
}
