//! Periodic background jobs.
//!
//! Each registered task gets its own tokio task and interval timer. A task
//! body runs to completion before its next tick; missed ticks are skipped, so
//! runs of the same task never overlap. Different tasks run concurrently.

mod tasks;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use tasks::{CleanupTask, UserSyncTask, VipExpiryTask};

/// A job the scheduler runs on a fixed interval
#[async_trait]
pub trait PeriodicTask: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    /// Wait before the first run; zero runs immediately on start
    fn initial_delay(&self) -> Duration {
        Duration::ZERO
    }

    /// One run; failures are the task's own to log
    async fn run(&self);
}

/// Owns the periodic tasks and their shared cancellation token
pub struct Scheduler {
    tasks: Vec<Arc<dyn PeriodicTask>>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_cancel(CancellationToken::new())
    }

    /// Scheduler stopped by (a child of) an existing token
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            tasks: Vec::new(),
            cancel,
            handles: Vec::new(),
        }
    }

    /// Register a task; takes effect on the next `start`
    pub fn add<T: PeriodicTask>(&mut self, task: T) -> &mut Self {
        self.tasks.push(Arc::new(task));
        self
    }

    /// Spawn one loop per task and return immediately
    pub fn start(&mut self) {
        if !self.handles.is_empty() {
            warn!("Scheduler already started");
            return;
        }
        for task in &self.tasks {
            let handle = tokio::spawn(run_periodic(Arc::clone(task), self.cancel.clone()));
            self.handles.push(handle);
        }
        info!(tasks = self.tasks.len(), "Scheduler started");
    }

    /// Signal every loop to stop; does not wait for in-flight runs
    pub fn stop(&self) {
        self.cancel.cancel();
        info!("Scheduler stop requested");
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty() && !self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for every loop to exit (after `stop`)
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Scheduled task panicked");
            }
        }
    }
}

async fn run_periodic(task: Arc<dyn PeriodicTask>, cancel: CancellationToken) {
    let name = task.name();
    let delay = task.initial_delay();

    if !delay.is_zero() {
        tokio::select! {
            () = cancel.cancelled() => return,
            () = sleep(delay) => {}
        }
    }

    let mut ticker = interval(task.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        task = name,
        interval_secs = task.interval().as_secs(),
        "Periodic task started"
    );

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!(task = name, "Periodic task stopped");
                break;
            }
            _ = ticker.tick() => {
                debug!(task = name, "Periodic task run");
                task.run().await;
            }
        }
    }
}
